//! Collaborator traits: modules that supply operations, reporters that
//! ingest results
//!
//! These traits are defined in core to avoid circular dependencies.
//! Implementations live in their respective crates (modules/, report/).

use crate::operation::Operation;
use crate::record::ResultRecord;

// ============================================================================
// Module Trait
// ============================================================================

/// A pluggable source of operations
pub trait Module: Send + Sync {
    /// Module identifier, attached to every result record
    fn name(&self) -> &str;

    /// Operations this module wants scheduled
    ///
    /// Called once per scheduler start. The scheduler keeps its own copies,
    /// so later changes to the module's operations have no effect on a
    /// running schedule.
    fn ops(&self) -> Vec<Operation>;
}

// ============================================================================
// Reporter Trait
// ============================================================================

/// Statistics ingestion point
///
/// The scheduler funnels every record through a single forwarding task, but a
/// reporter may be shared by several schedulers, so implementations must be
/// safe under concurrent calls. `op` should return quickly: a slow reporter
/// backs up the result channel and eventually causes records to be dropped.
pub trait Reporter: Send + Sync {
    /// Ingest one completed call
    fn op(&self, record: ResultRecord);
}

impl<R: Reporter + ?Sized> Reporter for std::sync::Arc<R> {
    fn op(&self, record: ResultRecord) {
        (**self).op(record)
    }
}

/// Reporter that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn op(&self, _record: ResultRecord) {}
}

/// A module assembled from a name and a fixed list of operations
///
/// Handy for tests and for embedding opbench as a library.
#[derive(Debug, Clone)]
pub struct StaticModule {
    name: String,
    ops: Vec<Operation>,
}

impl StaticModule {
    /// Create a module with no operations
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ops: Vec::new(),
        }
    }

    /// Add an operation
    pub fn with_op(mut self, op: Operation) -> Self {
        self.ops.push(op);
        self
    }

    /// Mutable access to the operations, for adjusting rates before start
    pub fn ops_mut(&mut self) -> &mut [Operation] {
        &mut self.ops
    }
}

impl Module for StaticModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn ops(&self) -> Vec<Operation> {
        self.ops.clone()
    }
}

//! Error types for opbench-modules

use thiserror::Error;

/// Invalid synthetic module definition
#[derive(Error, Debug)]
pub enum ModuleError {
    /// A module or operation name is empty
    #[error("{0} name must not be empty")]
    EmptyName(&'static str),

    /// Latency profile parameters are out of range
    #[error("invalid latency profile for {operation}: {reason}")]
    InvalidLatency {
        /// Operation name
        operation: String,
        /// What is wrong with the profile
        reason: String,
    },

    /// Failure probability outside 0.0 - 1.0
    #[error("invalid error rate {rate} for {operation}: must be between 0.0 and 1.0")]
    InvalidErrorRate {
        /// Operation name
        operation: String,
        /// Rejected value
        rate: f64,
    },

    /// Two operations of one module share a name
    #[error("module {module} defines operation {operation} more than once")]
    DuplicateOperation {
        /// Module name
        module: String,
        /// Repeated operation name
        operation: String,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ModuleError>;

//! Synthetic modules: operations that simulate latency and failures

use std::collections::HashSet;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use opbench_core::{CallResult, Module, OpError, Operation};

use crate::error::{ModuleError, Result};
use crate::latency::{LatencyProfile, LatencySampler};

fn default_enabled() -> bool {
    true
}

/// Definition of one synthetic operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticOpConfig {
    /// Operation name, unique within its module
    pub name: String,

    /// Target rate in calls per minute
    pub rate: u32,

    /// Whether the scheduler should run this operation
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// How long each call takes
    #[serde(default)]
    pub latency: LatencyProfile,

    /// Probability that a call fails (0.0 - 1.0)
    #[serde(default)]
    pub error_rate: f64,

    /// Report the sampled latency as the call's duration instead of sleeping
    ///
    /// Calls then return immediately while the scheduler sizes its worker
    /// pool as if they had taken the sampled time.
    #[serde(default)]
    pub report_latency: bool,
}

impl SyntheticOpConfig {
    /// An enabled, instant, never-failing operation
    pub fn new(name: impl Into<String>, rate: u32) -> Self {
        Self {
            name: name.into(),
            rate,
            enabled: true,
            latency: LatencyProfile::default(),
            error_rate: 0.0,
            report_latency: false,
        }
    }

    /// Set the latency profile
    pub fn with_latency(mut self, latency: LatencyProfile) -> Self {
        self.latency = latency;
        self
    }

    /// Set the failure probability
    pub fn with_error_rate(mut self, error_rate: f64) -> Self {
        self.error_rate = error_rate;
        self
    }

    /// Report latency through the duration override instead of sleeping
    pub fn with_report_latency(mut self, report: bool) -> Self {
        self.report_latency = report;
        self
    }

    /// Enable or disable the operation
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Validate and turn the definition into a schedulable operation
    pub fn build(&self) -> Result<Operation> {
        if self.name.trim().is_empty() {
            return Err(ModuleError::EmptyName("operation"));
        }
        if !(0.0..=1.0).contains(&self.error_rate) {
            return Err(ModuleError::InvalidErrorRate {
                operation: self.name.clone(),
                rate: self.error_rate,
            });
        }

        let behavior = Arc::new(Behavior {
            operation: self.name.clone(),
            sampler: self.latency.sampler(&self.name)?,
            error_rate: self.error_rate,
            report_latency: self.report_latency,
        });

        let op = Operation::new(self.name.clone(), self.rate, move || {
            let behavior = Arc::clone(&behavior);
            // Draw before the future is created; the thread-local RNG is not Send.
            let (latency, fail) = behavior.draw();
            async move { behavior.call(latency, fail).await }
        });

        Ok(op.enabled(self.enabled))
    }
}

/// Per-operation state shared by every call
struct Behavior {
    operation: String,
    sampler: LatencySampler,
    error_rate: f64,
    report_latency: bool,
}

impl Behavior {
    fn draw(&self) -> (std::time::Duration, bool) {
        let mut rng = rand::thread_rng();
        let latency = self.sampler.sample(&mut rng);
        let fail = self.error_rate > 0.0 && rng.gen_bool(self.error_rate);
        (latency, fail)
    }

    async fn call(&self, latency: std::time::Duration, fail: bool) -> std::result::Result<CallResult, OpError> {
        if !self.report_latency && !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if fail {
            return Err(OpError::failed(format!(
                "synthetic failure in {}",
                self.operation
            )));
        }

        if self.report_latency {
            Ok(CallResult::with_duration(latency))
        } else {
            Ok(CallResult::new())
        }
    }
}

/// Definition of a synthetic module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticModuleConfig {
    /// Module name
    pub name: String,

    /// Operations the module exposes
    #[serde(default)]
    pub ops: Vec<SyntheticOpConfig>,
}

impl SyntheticModuleConfig {
    /// A module with no operations
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ops: Vec::new(),
        }
    }

    /// Add an operation
    pub fn with_op(mut self, op: SyntheticOpConfig) -> Self {
        self.ops.push(op);
        self
    }
}

/// A module whose operations sleep for sampled latencies and fail at random
#[derive(Debug, Clone)]
pub struct SyntheticModule {
    name: String,
    ops: Vec<Operation>,
}

impl SyntheticModule {
    /// Build a module from its definition
    ///
    /// # Errors
    ///
    /// Returns an error if a name is empty, an operation name repeats, or a
    /// latency or failure profile is out of range.
    pub fn from_config(config: &SyntheticModuleConfig) -> Result<Self> {
        if config.name.trim().is_empty() {
            return Err(ModuleError::EmptyName("module"));
        }

        let mut seen = HashSet::new();
        let mut ops = Vec::with_capacity(config.ops.len());
        for op in &config.ops {
            if !seen.insert(op.name.as_str()) {
                return Err(ModuleError::DuplicateOperation {
                    module: config.name.clone(),
                    operation: op.name.clone(),
                });
            }
            ops.push(op.build()?);
        }

        tracing::debug!(module = %config.name, operations = ops.len(), "Synthetic module built");

        Ok(Self {
            name: config.name.clone(),
            ops,
        })
    }
}

impl Module for SyntheticModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn ops(&self) -> Vec<Operation> {
        self.ops.clone()
    }
}

//! Workload statistics snapshot

use std::time::Duration;

use serde::Serialize;

/// Point-in-time view of one workload
///
/// Published by the workload task through a watch channel after every
/// sampling tick and once more when it has fully drained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadStats {
    /// Module that owns the operation
    pub module: String,

    /// Operation name
    pub operation: String,

    /// Target rate in calls per minute
    pub target_rate: u32,

    /// Current pool size; never decreases
    pub workers: usize,

    /// Tick interval currently applied to every worker
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,

    /// Length of the sampling window
    #[serde(with = "humantime_serde")]
    pub sample_interval: Duration,

    /// Calls accounted so far (successes and failures)
    pub calls: u64,

    /// Failed calls
    pub errors: u64,

    /// Results dropped because the reporter could not keep up
    pub dropped_results: u64,

    /// Sampling ticks that produced a rescale decision
    pub rescales: u64,

    /// Sampling ticks skipped because the window saw no calls
    pub skipped_samples: u64,

    /// Interval changes applied by workers, summed once the pool has stopped
    pub interval_resets: u64,

    /// Average call duration in the most recent non-empty window
    #[serde(with = "humantime_serde")]
    pub last_average: Option<Duration>,

    /// Whether every worker has stopped
    pub stopped: bool,
}

impl WorkloadStats {
    /// Stats for a workload that has not started yet
    pub fn new(
        module: impl Into<String>,
        operation: impl Into<String>,
        target_rate: u32,
        sample_interval: Duration,
    ) -> Self {
        Self {
            module: module.into(),
            operation: operation.into(),
            target_rate,
            workers: 0,
            tick_interval: Duration::ZERO,
            sample_interval,
            calls: 0,
            errors: 0,
            dropped_results: 0,
            rescales: 0,
            skipped_samples: 0,
            interval_resets: 0,
            last_average: None,
            stopped: false,
        }
    }

    /// Successful calls
    pub fn successes(&self) -> u64 {
        self.calls.saturating_sub(self.errors)
    }

    /// Get the error rate (0.0 - 1.0)
    pub fn error_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.errors as f64 / self.calls as f64
        }
    }
}

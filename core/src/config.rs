//! Scheduler configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hard ceiling on workers per operation unless configured otherwise
pub const DEFAULT_MAX_WORKERS: usize = 50;

/// Calls expected within one sampling window at the target rate
pub const DEFAULT_EXPECTED_CALLS_PER_SAMPLE: u32 = 20;

/// Scheduler configuration
///
/// Controls how each workload sizes its worker pool and how often it
/// re-measures achieved throughput.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound on the number of workers a single operation may grow to
    #[serde(default = "default_max_workers")]
    pub max_workers_per_operation: usize,

    /// Number of calls a sampling window should contain at the target rate
    ///
    /// Larger values smooth out the measured average latency at the cost of
    /// reacting later to latency changes.
    #[serde(default = "default_expected_calls")]
    pub expected_calls_per_sample: u32,

    /// Lower bound on the sampling window
    #[serde(default = "default_min_sample_interval")]
    #[serde(with = "humantime_serde")]
    pub min_sample_interval: Duration,

    /// Upper bound on the sampling window
    #[serde(default = "default_max_sample_interval")]
    #[serde(with = "humantime_serde")]
    pub max_sample_interval: Duration,
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_expected_calls() -> u32 {
    DEFAULT_EXPECTED_CALLS_PER_SAMPLE
}

fn default_min_sample_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_max_sample_interval() -> Duration {
    Duration::from_secs(60)
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers_per_operation: default_max_workers(),
            expected_calls_per_sample: default_expected_calls(),
            min_sample_interval: default_min_sample_interval(),
            max_sample_interval: default_max_sample_interval(),
        }
    }
}

impl SchedulerConfig {
    /// Set the worker ceiling
    pub fn with_max_workers(mut self, max: usize) -> Self {
        self.max_workers_per_operation = max;
        self
    }

    /// Set the number of calls expected per sampling window
    pub fn with_expected_calls_per_sample(mut self, calls: u32) -> Self {
        self.expected_calls_per_sample = calls;
        self
    }

    /// Set the bounds of the sampling window
    pub fn with_sample_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.min_sample_interval = min;
        self.max_sample_interval = max;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers_per_operation == 0 {
            return Err(ConfigError::InvalidMaxWorkers(
                "max workers per operation must be at least 1".into(),
            ));
        }

        if self.expected_calls_per_sample == 0 {
            return Err(ConfigError::InvalidExpectedCalls(
                "expected calls per sample must be at least 1".into(),
            ));
        }

        if self.min_sample_interval.is_zero() {
            return Err(ConfigError::InvalidSampleInterval(
                "minimum sample interval must be positive".into(),
            ));
        }

        if self.min_sample_interval > self.max_sample_interval {
            return Err(ConfigError::InvalidSampleInterval(format!(
                "minimum sample interval {:?} exceeds maximum {:?}",
                self.min_sample_interval, self.max_sample_interval
            )));
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid worker ceiling
    #[error("Invalid max workers: {0}")]
    InvalidMaxWorkers(String),

    /// Invalid expected-calls figure
    #[error("Invalid expected calls per sample: {0}")]
    InvalidExpectedCalls(String),

    /// Invalid sampling window bounds
    #[error("Invalid sample interval: {0}")]
    InvalidSampleInterval(String),

    /// Invalid reporter channel settings
    #[error("Invalid channel configuration: {0}")]
    InvalidChannel(String),
}

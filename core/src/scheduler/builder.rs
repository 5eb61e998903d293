//! Builder pattern for Scheduler construction

use std::time::Duration;

use crate::channel::ChannelConfig;
use crate::config::SchedulerConfig;
use crate::error::Result;

use super::executor::Scheduler;

/// Builder for creating a Scheduler with validated configuration
///
/// # Example
///
/// ```ignore
/// let scheduler = SchedulerBuilder::new()
///     .max_workers(20)
///     .sample_bounds(Duration::from_millis(250), Duration::from_secs(30))
///     .result_buffer(50_000)
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    channel_config: ChannelConfig,
}

impl SchedulerBuilder {
    /// Create a new scheduler builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the full scheduler configuration
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the per-operation worker ceiling
    pub fn max_workers(mut self, max: usize) -> Self {
        self.config.max_workers_per_operation = max;
        self
    }

    /// Set how many calls each sampling window should expect
    pub fn expected_calls_per_sample(mut self, calls: u32) -> Self {
        self.config.expected_calls_per_sample = calls;
        self
    }

    /// Set the sampling window bounds
    pub fn sample_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.config.min_sample_interval = min;
        self.config.max_sample_interval = max;
        self
    }

    /// Set the channel configuration
    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel_config = config;
        self
    }

    /// Set the reporter handoff buffer size
    pub fn result_buffer(mut self, size: usize) -> Self {
        self.channel_config.result_buffer = size;
        self
    }

    /// Set how long a worker waits to queue a result before dropping it
    pub fn submit_timeout(mut self, timeout: Duration) -> Self {
        self.channel_config.submit_timeout = timeout;
        self
    }

    /// Set how long shutdown waits for queued results to reach the reporter
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.channel_config.drain_timeout = timeout;
        self
    }

    /// Build the scheduler
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if either configuration
    /// fails validation.
    pub fn build(self) -> Result<Scheduler> {
        self.config.validate()?;
        self.channel_config.validate()?;
        Ok(Scheduler::new(self.config, self.channel_config))
    }
}

//! Channel configuration for the reporter handoff

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Channel buffer configuration for worker -> reporter communication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Result channel buffer size (workers -> reporter forwarder)
    #[serde(default = "default_result_buffer")]
    pub result_buffer: usize,

    /// Longest a worker waits to queue one result before dropping it
    #[serde(default = "default_submit_timeout")]
    #[serde(with = "humantime_serde")]
    pub submit_timeout: Duration,

    /// Longest shutdown waits for queued results to reach the reporter
    #[serde(default = "default_drain_timeout")]
    #[serde(with = "humantime_serde")]
    pub drain_timeout: Duration,
}

fn default_result_buffer() -> usize {
    10_000
}

fn default_submit_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_drain_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            result_buffer: default_result_buffer(),
            submit_timeout: default_submit_timeout(),
            drain_timeout: default_drain_timeout(),
        }
    }
}

impl ChannelConfig {
    /// Set a custom result buffer size
    pub fn with_result_buffer(mut self, size: usize) -> Self {
        self.result_buffer = size;
        self
    }

    /// Set the submission timeout
    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    /// Set how long shutdown waits for the reporter backlog
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Validate the channel settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.result_buffer == 0 {
            return Err(ConfigError::InvalidChannel(
                "result buffer must hold at least one record".into(),
            ));
        }
        Ok(())
    }
}

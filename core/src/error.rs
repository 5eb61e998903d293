//! Error types for opbench-core

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

/// Scheduler error type
///
/// Every variant is a startup failure. Errors raised by individual operation
/// calls never surface here; they are forwarded to the reporter as [`OpError`].
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid scheduler or channel configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An enabled operation has a target rate of zero
    #[error("operation {module}/{operation} is enabled but has a rate of 0 calls per minute")]
    ZeroRate {
        /// Module that owns the operation
        module: String,
        /// Operation name
        operation: String,
    },

    /// No module exposed an enabled operation
    #[error("nothing to schedule: no enabled operations across {modules} module(s)")]
    NothingToSchedule {
        /// Number of modules inspected
        modules: usize,
    },

    /// `start` was called on a scheduler that is already running
    #[error("scheduler has already been started")]
    AlreadyStarted,
}

impl Error {
    /// Whether this error was caused by caller-supplied configuration
    ///
    /// All current variants except [`Error::AlreadyStarted`] are configuration
    /// mistakes that no amount of retrying will fix.
    pub fn is_config(&self) -> bool {
        !matches!(self, Error::AlreadyStarted)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by a single operation invocation
#[derive(Error, Debug)]
pub enum OpError {
    /// The operation ran and reported a failure
    #[error("{0}")]
    Failed(String),

    /// The operation gave up waiting on its target
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// IO error raised by the operation
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OpError {
    /// Convenience constructor for [`OpError::Failed`]
    pub fn failed(message: impl Into<String>) -> Self {
        OpError::Failed(message.into())
    }
}

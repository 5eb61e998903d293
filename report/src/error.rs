//! Error types for opbench-report

use thiserror::Error;

/// Reporter error type
#[derive(Error, Debug)]
pub enum ReportError {
    /// The reporter task has finished and no longer answers requests
    #[error("statistics reporter has shut down")]
    Closed,

    /// Failed to write a report
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to encode or decode a report
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Latency histogram could not be created
    #[error("histogram error: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ReportError>;

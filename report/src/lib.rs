//! Statistics reporting for opbench runs
//!
//! This crate provides:
//!
//! - [`StatsReporter`]: an actor implementing the core `Reporter` trait
//! - Per-operation execution, error and latency statistics
//! - JSON export and a human-readable summary table

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod histogram;
pub mod report;
pub mod reporter;
pub mod stats;

pub use error::{ReportError, Result};
pub use histogram::{LatencyHistogram, LatencyPercentiles};
pub use report::{OpSummary, Report};
pub use reporter::StatsReporter;
pub use stats::OpStats;

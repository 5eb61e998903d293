//! Built-in synthetic modules for opbench
//!
//! Synthetic operations stand in for real targets when exercising the
//! scheduler: each call waits for a latency drawn from a profile and fails
//! with a configurable probability.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod latency;
pub mod synthetic;

pub use error::{ModuleError, Result};
pub use latency::{LatencyProfile, LatencySampler};
pub use synthetic::{SyntheticModule, SyntheticModuleConfig, SyntheticOpConfig};

//! Workload module: the per-operation control loop
//!
//! One workload exists per scheduled operation. It owns an append-only pool
//! of workers and a sampling timer. Every worker call flows through a single
//! accounting channel read by the workload task, so the sampling window is
//! updated and reset by exactly one owner and no increment can be lost to a
//! concurrent reset.
//!
//! On each sampling tick:
//!
//! 1. `average = window duration / window calls` (skipped for an empty window)
//! 2. `required = min(ceil(rate / (1 minute / average)), max_workers)`
//! 3. spawn `required - current` workers if positive
//! 4. retune every worker to `1 minute × workers / rate`
//! 5. reset the window
//!
//! See [`scaling`] for the arithmetic.

mod accounting;
mod executor;
pub mod scaling;
mod stats;

pub(crate) use accounting::{Accounting, CallContext, CallSummary};
pub(crate) use executor::Workload;
pub use stats::WorkloadStats;

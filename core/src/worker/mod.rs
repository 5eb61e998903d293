//! Worker module: the per-operation tick loop
//!
//! A Worker is the smallest scheduling unit in opbench. Each one is a tokio
//! task that:
//!
//! 1. Waits for the next tick of its private timer (or cancellation)
//! 2. Invokes its workload's operation once, synchronously
//! 3. Accounts for the call and hands the result to the reporter
//! 4. Picks up interval changes pushed by its workload between ticks
//! 5. Repeats until the shared shutdown signal is raised
//!
//! ```text
//! Running -> (tick | interval changed)* -> Draining -> Stopped
//! ```
//!
//! `Stopped` is reached when the task returns its [`WorkerStats`]; the
//! workload treats the finished task handle as the completion signal.

mod executor;
mod stats;

pub(crate) use executor::Worker;
pub use stats::WorkerStats;

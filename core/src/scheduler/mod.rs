//! Scheduler: launches one workload per schedulable operation
//!
//! The Scheduler coordinates a complete run:
//! - Validating every module's operations before anything starts
//! - Spawning one workload task per enabled operation
//! - Forwarding result records to the reporter through a bounded channel
//! - Draining workloads after cancellation, then giving the reporter a
//!   bounded time to take the remaining backlog
//!
//! # Example
//!
//! ```ignore
//! use opbench_core::{SchedulerBuilder, Shutdown};
//!
//! let mut scheduler = SchedulerBuilder::new().max_workers(20).build()?;
//! let shutdown = Shutdown::new();
//!
//! scheduler.start(shutdown.listener(), &modules, reporter)?;
//! tokio::signal::ctrl_c().await?;
//! shutdown.trigger();
//!
//! let stats = scheduler.await_stop().await;
//! ```

mod aggregator;
mod builder;
mod executor;
mod forwarder;

pub use aggregator::{aggregate_workload_stats, AggregatedStats};
pub use builder::SchedulerBuilder;
pub use executor::Scheduler;

#[cfg(test)]
mod tests;

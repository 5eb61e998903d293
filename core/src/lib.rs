//! opbench-core: adaptive rate-controlled operation scheduling
//!
//! This crate drives pluggable operations at target rates expressed in calls
//! per minute, including:
//!
//! - Operation, Module and Reporter abstractions
//! - Workers that fire one call per tick of a resettable timer
//! - Workloads that measure latency and grow their worker pool to keep up
//! - The Scheduler that launches, drains and aggregates every workload
//! - Configuration, cancellation and error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod error;
pub mod operation;
pub mod record;
pub mod scheduler;
pub mod shutdown;
pub mod traits;
pub mod worker;
pub mod workload;

pub use channel::ChannelConfig;
pub use config::{ConfigError, SchedulerConfig, DEFAULT_MAX_WORKERS};
pub use error::{Error, OpError, Result};
pub use operation::{CallResult, Invoke, Operation};
pub use record::{CallOutcome, ResultRecord};
pub use scheduler::{aggregate_workload_stats, AggregatedStats, Scheduler, SchedulerBuilder};
pub use shutdown::{Shutdown, ShutdownListener};
pub use traits::{Module, NullReporter, Reporter, StaticModule};
pub use worker::WorkerStats;
pub use workload::WorkloadStats;

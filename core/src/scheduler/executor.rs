//! Scheduler execution logic

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::channel::ChannelConfig;
use crate::config::SchedulerConfig;
use crate::error::{Error, Result};
use crate::operation::Operation;
use crate::shutdown::ShutdownListener;
use crate::traits::{Module, Reporter};
use crate::workload::{Workload, WorkloadStats};

use super::aggregator::{aggregate_workload_stats, AggregatedStats};
use super::forwarder::Forwarder;

/// Tasks spawned by a successful `start`
struct Running {
    workloads: Vec<JoinHandle<WorkloadStats>>,
    forwarder: Forwarder,
    started_at: Instant,
}

/// Scheduler manages the lifecycle of one run
///
/// Each instance owns its workloads; several schedulers can run side by side
/// in one process, each against its own cancellation signal.
pub struct Scheduler {
    /// Worker pool sizing and sampling configuration
    pub(crate) config: SchedulerConfig,

    /// Reporter handoff configuration
    pub(crate) channel_config: ChannelConfig,

    /// Live statistics, one receiver per workload
    stats: Vec<watch::Receiver<WorkloadStats>>,

    /// Present between `start` and `await_stop`
    running: Option<Running>,

    /// Set by the first successful `start`; a scheduler runs once
    started: bool,
}

impl Scheduler {
    /// Create a new scheduler
    ///
    /// Use `SchedulerBuilder` for validated construction.
    pub fn new(config: SchedulerConfig, channel_config: ChannelConfig) -> Self {
        Self {
            config,
            channel_config,
            stats: Vec::new(),
            running: None,
            started: false,
        }
    }

    /// Get the scheduler configuration
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Get the reporter channel configuration
    pub fn channel_config(&self) -> &ChannelConfig {
        &self.channel_config
    }

    /// Number of workloads launched by `start`
    pub fn workload_count(&self) -> usize {
        self.stats.len()
    }

    /// Whether workloads are running or still draining
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Latest published statistics of every workload
    pub fn stats(&self) -> Vec<WorkloadStats> {
        self.stats.iter().map(|rx| rx.borrow().clone()).collect()
    }

    /// Run the startup checks of [`Scheduler::start`] without starting anything
    ///
    /// Returns the number of workloads `start` would launch.
    pub fn validate_modules(modules: &[Arc<dyn Module>]) -> Result<usize> {
        collect_operations(modules).map(|ops| ops.len())
    }

    /// Launch one workload per enabled operation across `modules`
    ///
    /// Every operation is validated before anything is spawned, so a
    /// configuration error leaves nothing running. Returns once all
    /// workloads have been launched. Must be called from within a Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::ZeroRate`] if an enabled operation has a rate of zero
    /// - [`Error::NothingToSchedule`] if no module exposes an enabled operation
    /// - [`Error::AlreadyStarted`] if this scheduler was started before
    pub fn start(
        &mut self,
        shutdown: ShutdownListener,
        modules: &[Arc<dyn Module>],
        reporter: Arc<dyn Reporter>,
    ) -> Result<()> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }

        let operations = collect_operations(modules)?;
        self.started = true;

        let (results_tx, results_rx) = mpsc::channel(self.channel_config.result_buffer);
        let forwarder = Forwarder::spawn(results_rx, reporter);

        let mut workloads = Vec::with_capacity(operations.len());
        for (module, operation) in operations {
            let (workload, stats_rx) = Workload::new(
                module,
                operation,
                results_tx.clone(),
                &self.config,
                &self.channel_config,
            );
            self.stats.push(stats_rx);
            workloads.push(tokio::spawn(workload.run(shutdown.clone())));
        }

        tracing::info!(
            modules = modules.len(),
            workloads = workloads.len(),
            max_workers = self.config.max_workers_per_operation,
            "Scheduler started"
        );

        self.running = Some(Running {
            workloads,
            forwarder,
            started_at: Instant::now(),
        });

        Ok(())
    }

    /// Wait until every workload has drained and its results were forwarded
    ///
    /// Cancellation must be raised first; until then this waits indefinitely.
    /// Once the workloads have drained, the reporter gets at most
    /// [`ChannelConfig::drain_timeout`] to take the remaining backlog; records
    /// still queued after that are counted as undelivered. Returns empty
    /// statistics if the scheduler is not running.
    pub async fn await_stop(&mut self) -> AggregatedStats {
        let Some(running) = self.running.take() else {
            return AggregatedStats::default();
        };

        let mut results = Vec::with_capacity(running.workloads.len());
        for (idx, outcome) in join_all(running.workloads).await.into_iter().enumerate() {
            match outcome {
                Ok(stats) => results.push(stats),
                Err(e) => {
                    tracing::error!(workload = idx, error = %e, "Workload task panicked");
                    // Fall back to the last published snapshot
                    if let Some(rx) = self.stats.get(idx) {
                        results.push(rx.borrow().clone());
                    }
                }
            }
        }

        let forwarded = running
            .forwarder
            .finish(self.channel_config.drain_timeout)
            .await;

        let mut aggregated = aggregate_workload_stats(&results, running.started_at.elapsed());
        aggregated.total_forwarded = forwarded;
        aggregated.total_undelivered = aggregated
            .total_calls
            .saturating_sub(aggregated.total_dropped)
            .saturating_sub(forwarded);

        tracing::info!(
            elapsed_secs = aggregated.total_duration.as_secs_f64(),
            workloads = aggregated.total_workloads,
            calls = aggregated.total_calls,
            errors = aggregated.total_errors,
            dropped = aggregated.total_dropped,
            undelivered = aggregated.total_undelivered,
            calls_per_minute = aggregated.calls_per_minute,
            "Scheduler stopped"
        );

        aggregated
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("channel_config", &self.channel_config)
            .field("workloads", &self.stats.len())
            .field("running", &self.running.is_some())
            .finish()
    }
}

/// Gather every schedulable operation, failing on the first misconfigured one
fn collect_operations(modules: &[Arc<dyn Module>]) -> Result<Vec<(Arc<str>, Operation)>> {
    let mut operations = Vec::new();

    for module in modules {
        let name: Arc<str> = Arc::from(module.name());
        for op in module.ops() {
            if !op.is_enabled() {
                tracing::debug!(module = %name, operation = op.name(), "Skipping disabled operation");
                continue;
            }
            if op.rate() == 0 {
                return Err(Error::ZeroRate {
                    module: name.to_string(),
                    operation: op.name().to_string(),
                });
            }
            operations.push((Arc::clone(&name), op));
        }
    }

    if operations.is_empty() {
        return Err(Error::NothingToSchedule {
            modules: modules.len(),
        });
    }

    Ok(operations)
}

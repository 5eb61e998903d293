//! Workload control loop

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::channel::ChannelConfig;
use crate::config::SchedulerConfig;
use crate::operation::Operation;
use crate::record::ResultRecord;
use crate::shutdown::ShutdownListener;
use crate::worker::{Worker, WorkerStats};

use super::accounting::{Accounting, CallContext};
use super::scaling::{self, SampleWindow};
use super::stats::WorkloadStats;

/// A running worker as seen by its workload
struct WorkerHandle {
    id: usize,
    interval_tx: watch::Sender<Duration>,
    handle: JoinHandle<WorkerStats>,
}

/// Keeps one operation at its target rate
///
/// Starts with a single worker ticking at the full target rate, then on every
/// sampling tick measures the average call duration and grows the pool to
/// the number of workers that latency calls for. The pool never shrinks; a
/// pool larger than needed is slowed down by stretching every worker's
/// interval so the aggregate stays at the target rate.
pub(crate) struct Workload {
    ctx: Arc<CallContext>,
    rate: u32,
    max_workers: usize,
    sample_interval: Duration,
    workers: Vec<WorkerHandle>,
    accounting_rx: mpsc::UnboundedReceiver<Accounting>,
    window: SampleWindow,
    stats: WorkloadStats,
    stats_tx: watch::Sender<WorkloadStats>,
}

impl Workload {
    /// Create a workload for `operation`
    ///
    /// The caller must have checked that the rate is positive. Returns the
    /// workload and a receiver for its published statistics.
    pub(crate) fn new(
        module: Arc<str>,
        operation: Operation,
        results_tx: mpsc::Sender<ResultRecord>,
        config: &SchedulerConfig,
        channel: &ChannelConfig,
    ) -> (Self, watch::Receiver<WorkloadStats>) {
        let rate = operation.rate();
        let sample_interval = scaling::sample_interval(rate, config);
        let stats = WorkloadStats::new(&*module, operation.name(), rate, sample_interval);
        let (stats_tx, stats_rx) = watch::channel(stats.clone());

        let (accounting_tx, accounting_rx) = mpsc::unbounded_channel();
        let ctx = Arc::new(CallContext::new(
            module,
            operation,
            accounting_tx,
            results_tx,
            channel.submit_timeout,
        ));

        let workload = Self {
            ctx,
            rate,
            max_workers: config.max_workers_per_operation,
            sample_interval,
            workers: Vec::new(),
            accounting_rx,
            window: SampleWindow::default(),
            stats,
            stats_tx,
        };

        (workload, stats_rx)
    }

    /// Run the control loop until cancellation, then drain every worker
    ///
    /// Returns the final statistics once all workers have stopped.
    pub(crate) async fn run(mut self, shutdown: ShutdownListener) -> WorkloadStats {
        let mut listener = shutdown.clone();

        let initial = scaling::tick_interval(self.rate, 1);
        self.spawn_workers(1, initial, &shutdown);
        self.stats.tick_interval = initial;
        self.publish();

        let mut sampler = interval_at(Instant::now() + self.sample_interval, self.sample_interval);
        sampler.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(
            module = self.ctx.module(),
            operation = self.ctx.operation(),
            rate = self.rate,
            sample_interval_ms = self.sample_interval.as_millis() as u64,
            "Workload started"
        );

        loop {
            tokio::select! {
                biased;

                _ = listener.cancelled() => break,

                // Ahead of accounting so a busy inbox cannot hold off rescaling.
                _ = sampler.tick() => self.rescale(&shutdown),

                Some(msg) = self.accounting_rx.recv() => self.account(msg),
            }
        }

        self.drain().await
    }

    /// Account for every message already queued
    fn drain_accounting(&mut self) {
        while let Ok(msg) = self.accounting_rx.try_recv() {
            self.account(msg);
        }
    }

    fn account(&mut self, msg: Accounting) {
        match msg {
            Accounting::Call { duration, failed } => {
                self.window.record(duration);
                self.stats.calls += 1;
                if failed {
                    self.stats.errors += 1;
                }
            }
            Accounting::Dropped => self.stats.dropped_results += 1,
        }
    }

    /// One sampling tick: measure, grow if needed, retune every worker
    fn rescale(&mut self, shutdown: &ShutdownListener) {
        self.drain_accounting();
        let window = self.window.take();
        let current = self.workers.len();

        let Some(rescale) = scaling::plan(&window, self.rate, current, self.max_workers) else {
            tracing::trace!(
                operation = self.ctx.operation(),
                "No calls in sampling window, skipping rescale"
            );
            self.stats.skipped_samples += 1;
            self.publish();
            return;
        };

        if rescale.add > 0 {
            self.spawn_workers(rescale.add, rescale.interval, shutdown);
        }

        for worker in &self.workers {
            worker.interval_tx.send_if_modified(|interval| {
                if *interval == rescale.interval {
                    false
                } else {
                    *interval = rescale.interval;
                    true
                }
            });
        }

        tracing::debug!(
            module = self.ctx.module(),
            operation = self.ctx.operation(),
            calls = window.calls,
            average_ms = rescale.average.as_secs_f64() * 1000.0,
            required = rescale.required,
            added = rescale.add,
            workers = self.workers.len(),
            interval_ms = rescale.interval.as_secs_f64() * 1000.0,
            "Workload rescaled"
        );

        self.stats.rescales += 1;
        self.stats.tick_interval = rescale.interval;
        self.stats.last_average = Some(rescale.average);
        self.publish();
    }

    fn spawn_workers(&mut self, count: usize, interval: Duration, shutdown: &ShutdownListener) {
        for _ in 0..count {
            let id = self.workers.len();
            let (interval_tx, interval_rx) = watch::channel(interval);
            let worker = Worker::new(id, Arc::clone(&self.ctx), interval_rx);
            let handle = tokio::spawn(worker.run(shutdown.clone()));
            self.workers.push(WorkerHandle {
                id,
                interval_tx,
                handle,
            });
        }
        self.stats.workers = self.workers.len();
    }

    /// Wait for every worker's completion, in any order, then report done
    async fn drain(mut self) -> WorkloadStats {
        tracing::debug!(
            operation = self.ctx.operation(),
            workers = self.workers.len(),
            "Workload draining"
        );

        let mut totals = WorkerStats::new();
        let mut panicked = 0usize;
        for WorkerHandle {
            id,
            interval_tx: _interval_tx,
            handle,
        } in std::mem::take(&mut self.workers)
        {
            match handle.await {
                Ok(stats) => totals.merge(&stats),
                Err(e) => {
                    panicked += 1;
                    tracing::error!(
                        operation = self.ctx.operation(),
                        worker_id = id,
                        error = %e,
                        "Worker task panicked"
                    );
                }
            }
        }

        // Accounting sent by the last calls before their workers stopped.
        self.drain_accounting();

        // Workers count the same calls on their side; a panicked worker takes
        // its counts with it.
        let worker_calls = totals.total_calls() as u64;
        if panicked == 0 && worker_calls != self.stats.calls {
            tracing::warn!(
                operation = self.ctx.operation(),
                accounted = self.stats.calls,
                reported_by_workers = worker_calls,
                "Call accounting disagrees with worker totals"
            );
        }

        self.stats.interval_resets = totals.interval_resets as u64;
        self.stats.stopped = true;
        self.publish();

        tracing::debug!(
            module = self.ctx.module(),
            operation = self.ctx.operation(),
            workers = self.stats.workers,
            calls = self.stats.calls,
            errors = self.stats.errors,
            dropped = self.stats.dropped_results,
            interval_resets = self.stats.interval_resets,
            "Workload stopped"
        );

        self.stats
    }

    #[cfg(test)]
    pub(crate) fn accounting_sender(&self) -> mpsc::UnboundedSender<Accounting> {
        self.ctx.accounting_sender()
    }

    fn publish(&self) {
        self.stats_tx.send_replace(self.stats.clone());
    }
}

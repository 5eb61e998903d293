//! Worker tick loop

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::shutdown::ShutdownListener;
use crate::workload::CallContext;

use super::stats::WorkerStats;

/// One concurrent caller of a workload's operation
///
/// A worker fires exactly one call per elapsed tick and waits for it to
/// finish before looking at its timer again, so a slow call delays only this
/// worker. The owning workload retunes the interval through a watch channel;
/// a new interval applies from the next tick on and never fires the ticks a
/// slow call missed.
pub(crate) struct Worker {
    /// Position in the owning workload's pool
    id: usize,

    /// Per-call accounting shared with sibling workers
    ctx: Arc<CallContext>,

    /// Tick interval, written by the workload
    interval_rx: watch::Receiver<Duration>,
}

impl Worker {
    pub(crate) fn new(id: usize, ctx: Arc<CallContext>, interval_rx: watch::Receiver<Duration>) -> Self {
        Self {
            id,
            ctx,
            interval_rx,
        }
    }

    /// Run until cancellation
    ///
    /// Returning is the worker's completion signal: the owning workload
    /// awaits the task handle. A call in flight when cancellation is raised
    /// is allowed to finish first.
    pub(crate) async fn run(self, mut shutdown: ShutdownListener) -> WorkerStats {
        let Worker {
            id,
            ctx,
            mut interval_rx,
        } = self;

        let mut stats = WorkerStats::new();

        let mut period = *interval_rx.borrow_and_update();
        let mut ticker = new_ticker(period);

        tracing::debug!(
            module = ctx.module(),
            operation = ctx.operation(),
            worker_id = id,
            interval_ms = period.as_secs_f64() * 1000.0,
            "Worker started"
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    tracing::debug!(worker_id = id, operation = ctx.operation(), "Worker draining");
                    break;
                }

                changed = interval_rx.changed() => {
                    if changed.is_err() {
                        tracing::debug!(
                            worker_id = id,
                            operation = ctx.operation(),
                            "Interval control closed, worker stopping"
                        );
                        break;
                    }
                    period = *interval_rx.borrow_and_update();
                    ticker = new_ticker(period);
                    stats.record_reset();
                }

                _ = ticker.tick() => {
                    let call = ctx.do_op().await;
                    stats.record_call(&call);
                }
            }
        }

        tracing::debug!(
            module = ctx.module(),
            operation = ctx.operation(),
            worker_id = id,
            completed = stats.completed,
            errors = stats.errors,
            dropped = stats.dropped,
            "Worker stopped"
        );

        stats
    }
}

/// Timer whose first tick is one full period away
fn new_ticker(period: Duration) -> Interval {
    let period = period.max(Duration::from_nanos(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

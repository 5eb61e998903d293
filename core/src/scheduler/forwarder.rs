//! Reporter handoff

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::record::ResultRecord;
use crate::traits::Reporter;

/// Most records handed to the reporter per blocking task
const BATCH_SIZE: usize = 256;

/// The task that delivers queued records to the reporter
///
/// `Reporter::op` is synchronous and may block, so every batch is run on the
/// blocking pool. A slow reporter then backs up the bounded results channel
/// instead of stalling the runtime threads the workers tick on.
pub(crate) struct Forwarder {
    handle: JoinHandle<()>,
    delivered: Arc<AtomicU64>,
    abandoned: Arc<AtomicBool>,
}

impl Forwarder {
    /// Deliver every queued record to `reporter`, in arrival order
    ///
    /// The task ends once every sender (one per workload) has been dropped
    /// and the channel is empty.
    pub(crate) fn spawn(
        mut results_rx: mpsc::Receiver<ResultRecord>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let delivered = Arc::new(AtomicU64::new(0));
        let abandoned = Arc::new(AtomicBool::new(false));

        let handle = {
            let delivered = Arc::clone(&delivered);
            let abandoned = Arc::clone(&abandoned);
            tokio::spawn(async move {
                let mut batch = Vec::with_capacity(BATCH_SIZE);
                while results_rx.recv_many(&mut batch, BATCH_SIZE).await > 0 {
                    let records = std::mem::replace(&mut batch, Vec::with_capacity(BATCH_SIZE));
                    let reporter = Arc::clone(&reporter);
                    let delivered = Arc::clone(&delivered);
                    let abandoned = Arc::clone(&abandoned);

                    let outcome = tokio::task::spawn_blocking(move || {
                        for record in records {
                            if abandoned.load(Ordering::Acquire) {
                                return;
                            }
                            reporter.op(record);
                            delivered.fetch_add(1, Ordering::Release);
                        }
                    })
                    .await;

                    if let Err(e) = outcome {
                        tracing::error!(error = %e, "Reporter panicked, no further results delivered");
                        return;
                    }
                }
                tracing::debug!(
                    forwarded = delivered.load(Ordering::Acquire),
                    "Result forwarder finished"
                );
            })
        };

        Self {
            handle,
            delivered,
            abandoned,
        }
    }

    /// Records handed to the reporter so far
    pub(crate) fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Acquire)
    }

    /// Wait at most `limit` for the backlog to reach the reporter
    ///
    /// On timeout the forwarder is abandoned: no record is handed over after
    /// the call currently inside the reporter returns. Returns the number of
    /// records delivered.
    pub(crate) async fn finish(mut self, limit: Duration) -> u64 {
        match tokio::time::timeout(limit, &mut self.handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Result forwarder panicked");
            }
            Err(_) => {
                self.abandoned.store(true, Ordering::Release);
                self.handle.abort();
                tracing::warn!(
                    timeout_ms = limit.as_millis() as u64,
                    delivered = self.delivered(),
                    "Reporter did not drain in time, abandoning queued results"
                );
            }
        }
        self.delivered()
    }
}

//! Per-call accounting shared by every worker of one workload

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::time::Instant;

use crate::operation::Operation;
use crate::record::ResultRecord;

/// Message from a worker to its workload's accounting loop
///
/// The workload task is the only reader, which serializes every update to the
/// sampling window without a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Accounting {
    /// One call completed
    Call {
        /// Duration counted toward the sampling window
        duration: Duration,
        /// Whether the call returned an error
        failed: bool,
    },
    /// The result of a call could not be handed to the reporter in time
    Dropped,
}

/// Outcome of one `do_op`, as seen by the calling worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CallSummary {
    pub duration: Duration,
    pub failed: bool,
    pub dropped: bool,
}

/// Everything a worker needs to perform and account for one call
pub(crate) struct CallContext {
    operation: Operation,
    module: Arc<str>,
    name: Arc<str>,
    accounting_tx: mpsc::UnboundedSender<Accounting>,
    results_tx: mpsc::Sender<ResultRecord>,
    submit_timeout: Duration,
}

impl CallContext {
    pub(crate) fn new(
        module: Arc<str>,
        operation: Operation,
        accounting_tx: mpsc::UnboundedSender<Accounting>,
        results_tx: mpsc::Sender<ResultRecord>,
        submit_timeout: Duration,
    ) -> Self {
        let name: Arc<str> = Arc::from(operation.name());
        Self {
            operation,
            module,
            name,
            accounting_tx,
            results_tx,
            submit_timeout,
        }
    }

    pub(crate) fn module(&self) -> &str {
        &self.module
    }

    pub(crate) fn operation(&self) -> &str {
        &self.name
    }

    #[cfg(test)]
    pub(crate) fn accounting_sender(&self) -> mpsc::UnboundedSender<Accounting> {
        self.accounting_tx.clone()
    }

    /// Invoke the operation once, account for it, and hand the result off
    pub(crate) async fn do_op(&self) -> CallSummary {
        let start = Instant::now();
        let result = self.operation.invoke().await;
        let elapsed = start.elapsed();

        let (duration, record) = match result {
            Ok(call) => {
                let duration = call.duration.unwrap_or(elapsed);
                let record =
                    ResultRecord::success(Arc::clone(&self.module), Arc::clone(&self.name), duration);
                (duration, record)
            }
            Err(e) => {
                tracing::debug!(
                    module = %self.module,
                    operation = %self.name,
                    error = %e,
                    "Operation call failed"
                );
                let record =
                    ResultRecord::failure(Arc::clone(&self.module), Arc::clone(&self.name), e);
                (elapsed, record)
            }
        };
        let failed = !record.outcome.is_success();

        self.account(Accounting::Call { duration, failed });

        let dropped = !self.submit(record).await;
        if dropped {
            self.account(Accounting::Dropped);
        }

        CallSummary {
            duration,
            failed,
            dropped,
        }
    }

    /// Send one accounting message to the workload
    ///
    /// The workload outlives its workers, so this only fails while it is
    /// being torn down after a panic.
    fn account(&self, msg: Accounting) {
        if self.accounting_tx.send(msg).is_err() {
            tracing::debug!(
                module = %self.module,
                operation = %self.name,
                message = ?msg,
                "Workload accounting closed, call not counted"
            );
        }
    }

    /// Queue a record for the reporter, waiting at most `submit_timeout`
    ///
    /// Returns `false` if the record was dropped.
    async fn submit(&self, record: ResultRecord) -> bool {
        match self.results_tx.send_timeout(record, self.submit_timeout).await {
            Ok(()) => true,
            Err(SendTimeoutError::Timeout(_)) => {
                tracing::warn!(
                    module = %self.module,
                    operation = %self.name,
                    timeout_ms = self.submit_timeout.as_millis() as u64,
                    "Reporter backlog full, dropping result"
                );
                false
            }
            Err(SendTimeoutError::Closed(_)) => {
                tracing::debug!(
                    module = %self.module,
                    operation = %self.name,
                    "Reporter channel closed, dropping result"
                );
                false
            }
        }
    }
}

//! Actor-based statistics reporter

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use opbench_core::{Reporter, ResultRecord};

use crate::error::{ReportError, Result};
use crate::histogram::LatencyHistogram;
use crate::report::Report;
use crate::stats::OpStats;

enum Command {
    Record(ResultRecord),
    Snapshot(oneshot::Sender<Report>),
    Finish(oneshot::Sender<Report>),
}

/// Statistics reporter backed by a single owner task
///
/// Every record, snapshot and finish request goes through one ordered inbox,
/// so a snapshot reflects every record submitted before it from the same
/// task. `op` never blocks; the inbox is unbounded because the scheduler
/// already bounds the flow of records ahead of it.
#[derive(Debug, Clone)]
pub struct StatsReporter {
    tx: mpsc::UnboundedSender<Command>,
}

impl StatsReporter {
    /// Spawn the aggregation task on the current Tokio runtime
    pub fn spawn() -> Result<Self> {
        let aggregator = Aggregator::new()?;
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(aggregator.run(rx));
        Ok(Self { tx })
    }

    /// Figures as of every record received so far
    pub async fn snapshot(&self) -> Result<Report> {
        self.request(Command::Snapshot).await
    }

    /// Final figures; the reporter ignores records sent afterwards
    pub async fn finish(&self) -> Result<Report> {
        self.request(Command::Finish).await
    }

    async fn request(&self, command: fn(oneshot::Sender<Report>) -> Command) -> Result<Report> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(command(reply_tx))
            .map_err(|_| ReportError::Closed)?;
        reply_rx.await.map_err(|_| ReportError::Closed)
    }
}

impl Reporter for StatsReporter {
    fn op(&self, record: ResultRecord) {
        if self.tx.send(Command::Record(record)).is_err() {
            tracing::debug!("Statistics reporter finished, discarding record");
        }
    }
}

/// State owned by the reporter task
struct Aggregator {
    ops: BTreeMap<(Arc<str>, Arc<str>), OpStats>,
    template: LatencyHistogram,
    started_at: DateTime<Utc>,
}

impl Aggregator {
    fn new() -> Result<Self> {
        Ok(Self {
            ops: BTreeMap::new(),
            template: LatencyHistogram::new()?,
            started_at: Utc::now(),
        })
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        tracing::debug!("Statistics reporter started");

        while let Some(command) = rx.recv().await {
            match command {
                Command::Record(record) => self.record(record),
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.report());
                }
                Command::Finish(reply) => {
                    let _ = reply.send(self.report());
                    break;
                }
            }
        }

        tracing::debug!(operations = self.ops.len(), "Statistics reporter stopped");
    }

    fn record(&mut self, record: ResultRecord) {
        let key = (Arc::clone(&record.module), Arc::clone(&record.operation));
        let template = &self.template;
        self.ops
            .entry(key)
            .or_insert_with(|| {
                OpStats::new(
                    Arc::clone(&record.module),
                    Arc::clone(&record.operation),
                    template.empty_like(),
                )
            })
            .record(&record);
    }

    fn report(&self) -> Report {
        let operations: Vec<_> = self.ops.values().map(OpStats::summary).collect();
        Report {
            started_at: self.started_at,
            generated_at: Utc::now(),
            total_executions: operations.iter().map(|s| s.executions).sum(),
            total_errors: operations.iter().map(|s| s.errors).sum(),
            operations,
        }
    }
}

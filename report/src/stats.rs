//! Per-operation statistics

use std::sync::Arc;
use std::time::Duration;

use opbench_core::{CallOutcome, ResultRecord};

use crate::histogram::LatencyHistogram;
use crate::report::OpSummary;

/// Running statistics for one (module, operation) pair
///
/// Failed calls count toward executions and errors only; timing figures are
/// built from successful calls alone.
#[derive(Debug, Clone)]
pub struct OpStats {
    module: Arc<str>,
    operation: Arc<str>,
    executions: u64,
    errors: u64,
    shortest: Option<Duration>,
    longest: Option<Duration>,
    total_success: Duration,
    histogram: LatencyHistogram,
    last_error: Option<String>,
}

impl OpStats {
    /// Empty statistics, recording latencies into `histogram`
    pub fn new(module: Arc<str>, operation: Arc<str>, histogram: LatencyHistogram) -> Self {
        Self {
            module,
            operation,
            executions: 0,
            errors: 0,
            shortest: None,
            longest: None,
            total_success: Duration::ZERO,
            histogram,
            last_error: None,
        }
    }

    /// Fold one record into the statistics
    pub fn record(&mut self, record: &ResultRecord) {
        self.executions += 1;
        match &record.outcome {
            CallOutcome::Success { duration } => {
                let duration = *duration;
                self.shortest = Some(self.shortest.map_or(duration, |s| s.min(duration)));
                self.longest = Some(self.longest.map_or(duration, |l| l.max(duration)));
                self.total_success = self.total_success.saturating_add(duration);
                self.histogram.record(duration);
            }
            CallOutcome::Failure { error } => {
                self.errors += 1;
                self.last_error = Some(error.clone());
            }
        }
    }

    /// Total calls seen, successful or not
    pub fn executions(&self) -> u64 {
        self.executions
    }

    /// Failed calls seen
    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// Successful calls seen
    pub fn successes(&self) -> u64 {
        self.executions - self.errors
    }

    /// Get the error rate (0.0 - 1.0)
    pub fn error_rate(&self) -> f64 {
        if self.executions == 0 {
            0.0
        } else {
            self.errors as f64 / self.executions as f64
        }
    }

    /// Shortest successful call
    pub fn shortest(&self) -> Option<Duration> {
        self.shortest
    }

    /// Longest successful call
    pub fn longest(&self) -> Option<Duration> {
        self.longest
    }

    /// Mean duration of successful calls
    pub fn average(&self) -> Option<Duration> {
        let successes = self.successes();
        if successes == 0 {
            return None;
        }
        let nanos = self.total_success.as_nanos() / u128::from(successes);
        Some(u64::try_from(nanos).map_or(Duration::MAX, Duration::from_nanos))
    }

    /// Serializable summary of the current figures
    pub fn summary(&self) -> OpSummary {
        OpSummary {
            module: self.module.to_string(),
            operation: self.operation.to_string(),
            executions: self.executions,
            errors: self.errors,
            error_rate: self.error_rate(),
            average_ms: self.average().map(as_ms),
            shortest_ms: self.shortest.map(as_ms),
            longest_ms: self.longest.map(as_ms),
            percentiles: self.histogram.percentiles(),
            last_error: self.last_error.clone(),
        }
    }
}

fn as_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

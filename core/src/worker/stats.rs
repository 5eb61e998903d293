//! Worker statistics tracking

use crate::workload::CallSummary;

/// Statistics tracked by each worker
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    /// Number of successful calls
    pub completed: usize,

    /// Number of failed calls
    pub errors: usize,

    /// Results that could not be handed to the reporter in time
    pub dropped: usize,

    /// Times the tick interval was changed by the workload
    pub interval_resets: usize,
}

impl WorkerStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Total calls made (completed + errors)
    pub fn total_calls(&self) -> usize {
        self.completed + self.errors
    }

    pub(crate) fn record_call(&mut self, call: &CallSummary) {
        if call.failed {
            self.errors += 1;
        } else {
            self.completed += 1;
        }
        if call.dropped {
            self.dropped += 1;
        }
    }

    pub(crate) fn record_reset(&mut self) {
        self.interval_resets += 1;
    }

    /// Merge stats from another worker
    pub fn merge(&mut self, other: &WorkerStats) {
        self.completed += other.completed;
        self.errors += other.errors;
        self.dropped += other.dropped;
        self.interval_resets += other.interval_resets;
    }
}

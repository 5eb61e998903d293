//! Result aggregation across workloads

use std::time::Duration;

use serde::Serialize;

use crate::workload::WorkloadStats;

/// Aggregated statistics from all workloads of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregatedStats {
    /// Number of workloads that drained
    pub total_workloads: usize,

    /// Workers across all workloads at shutdown
    pub total_workers: usize,

    /// Total calls made (successes and failures)
    pub total_calls: u64,

    /// Total failed calls
    pub total_errors: u64,

    /// Results dropped at the reporter handoff
    pub total_dropped: u64,

    /// Records the forwarder delivered to the reporter
    pub total_forwarded: u64,

    /// Queued records abandoned because the reporter did not drain in time
    pub total_undelivered: u64,

    /// Wall-clock time between start and full drain
    #[serde(with = "humantime_serde")]
    pub total_duration: Duration,

    /// Achieved call rate across all workloads
    pub calls_per_minute: f64,

    /// Final statistics of every workload
    pub workloads: Vec<WorkloadStats>,
}

impl AggregatedStats {
    /// Total successful calls
    pub fn total_successes(&self) -> u64 {
        self.total_calls.saturating_sub(self.total_errors)
    }

    /// Get the success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.total_calls > 0 {
            self.total_successes() as f64 / self.total_calls as f64
        } else {
            0.0
        }
    }

    /// Get the error rate (0.0 - 1.0)
    pub fn error_rate(&self) -> f64 {
        if self.total_calls > 0 {
            self.total_errors as f64 / self.total_calls as f64
        } else {
            0.0
        }
    }
}

/// Aggregate the final statistics of every workload
///
/// `elapsed` is the time from start to full drain; the forwarded and
/// undelivered counts are filled in by the scheduler once its forwarder has
/// finished.
pub fn aggregate_workload_stats(stats: &[WorkloadStats], elapsed: Duration) -> AggregatedStats {
    if stats.is_empty() {
        return AggregatedStats {
            total_duration: elapsed,
            ..AggregatedStats::default()
        };
    }

    let total_calls: u64 = stats.iter().map(|s| s.calls).sum();
    let total_errors: u64 = stats.iter().map(|s| s.errors).sum();
    let total_dropped: u64 = stats.iter().map(|s| s.dropped_results).sum();
    let total_workers: usize = stats.iter().map(|s| s.workers).sum();

    let minutes = elapsed.as_secs_f64() / 60.0;
    let calls_per_minute = if minutes > 0.0 {
        total_calls as f64 / minutes
    } else {
        0.0
    };

    AggregatedStats {
        total_workloads: stats.len(),
        total_workers,
        total_calls,
        total_errors,
        total_dropped,
        total_forwarded: 0,
        total_undelivered: 0,
        total_duration: elapsed,
        calls_per_minute,
        workloads: stats.to_vec(),
    }
}

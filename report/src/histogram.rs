//! Latency histogram for percentile calculation

use std::time::Duration;

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Highest trackable latency: one hour, in microseconds
const MAX_MICROS: u64 = 3_600_000_000;

/// Latency percentiles (all values in milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct LatencyPercentiles {
    /// 50th percentile (median)
    pub p50: f64,
    /// 90th percentile
    pub p90: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
}

/// Successful-call durations of one operation
///
/// Backed by HdrHistogram with microsecond precision, so memory stays
/// constant however long a run lasts. Durations beyond one hour are clamped.
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    /// Create an empty histogram
    pub fn new() -> Result<Self> {
        let histogram = Histogram::new_with_bounds(1, MAX_MICROS, 3)?;
        Ok(Self { histogram })
    }

    /// An empty histogram with the same bounds as this one
    pub fn empty_like(&self) -> Self {
        let mut histogram = self.histogram.clone();
        histogram.reset();
        Self { histogram }
    }

    /// Record a duration
    pub fn record(&mut self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.histogram.saturating_record(micros);
    }

    /// Get the number of recorded values
    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    /// Check if the histogram is empty
    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// Calculate percentiles, or `None` if nothing was recorded
    pub fn percentiles(&self) -> Option<LatencyPercentiles> {
        if self.histogram.is_empty() {
            return None;
        }

        let ms = |q: f64| self.histogram.value_at_quantile(q) as f64 / 1000.0;
        Some(LatencyPercentiles {
            p50: ms(0.50),
            p90: ms(0.90),
            p95: ms(0.95),
            p99: ms(0.99),
        })
    }
}

//! Rate and pool-size arithmetic for the workload control loop
//!
//! All rates are calls per minute. Calculations run on integer nanoseconds so
//! that a latency which divides the minute evenly lands on an exact worker
//! count instead of rounding up past it.

use std::time::Duration;

use crate::config::SchedulerConfig;

const MINUTE_NANOS: u128 = 60_000_000_000;

/// Tick interval that spreads `rate` calls per minute across `workers`
///
/// Equivalent to `1 minute / (rate / workers)`. Never returns zero.
pub fn tick_interval(rate: u32, workers: usize) -> Duration {
    debug_assert!(rate > 0, "tick_interval requires a positive rate");
    let rate = u128::from(rate.max(1));
    let workers = workers.max(1) as u128;
    let nanos = (MINUTE_NANOS * workers / rate).max(1);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Length of one sampling window for an operation running at `rate`
///
/// The window is sized so that `expected_calls_per_sample` calls are expected
/// at the target rate, then clamped to the configured bounds.
pub fn sample_interval(rate: u32, config: &SchedulerConfig) -> Duration {
    let per_call = tick_interval(rate, 1);
    let expected = per_call.saturating_mul(config.expected_calls_per_sample);
    expected.clamp(config.min_sample_interval, config.max_sample_interval)
}

/// Workers needed to sustain `rate` when one call takes `average`
///
/// `ceil(rate / (1 minute / average))`, at least 1 and at most `max_workers`.
pub fn required_workers(rate: u32, average: Duration, max_workers: usize) -> usize {
    let demand = u128::from(rate) * average.as_nanos();
    let required = demand.div_ceil(MINUTE_NANOS).max(1);
    usize::try_from(required)
        .unwrap_or(usize::MAX)
        .min(max_workers.max(1))
}

/// Calls and accumulated duration since the last sampling tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleWindow {
    /// Calls observed
    pub calls: u64,
    /// Sum of their durations
    pub total: Duration,
}

impl SampleWindow {
    /// Account for one call
    pub fn record(&mut self, duration: Duration) {
        self.calls += 1;
        self.total = self.total.saturating_add(duration);
    }

    /// Average call duration, or `None` if no call was observed
    pub fn average(&self) -> Option<Duration> {
        if self.calls == 0 {
            return None;
        }
        let nanos = self.total.as_nanos() / u128::from(self.calls);
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }

    /// Return the current window and start a fresh one
    pub fn take(&mut self) -> SampleWindow {
        std::mem::take(self)
    }
}

/// Decision produced by one sampling tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rescale {
    /// Average latency measured over the window
    pub average: Duration,
    /// Workers the measurement calls for
    pub required: usize,
    /// Workers to spawn now (zero when the pool is already large enough)
    pub add: usize,
    /// Tick interval to apply to every worker afterwards
    pub interval: Duration,
}

impl Rescale {
    /// Pool size after applying this decision
    pub fn workers_after(&self, current: usize) -> usize {
        current + self.add
    }
}

/// Plan the rescale for one sampling window
///
/// Returns `None` when the window saw no calls. The pool only ever grows:
/// when fewer workers than `current` would do, none are added and the
/// interval is stretched so the existing workers share the target rate.
pub fn plan(window: &SampleWindow, rate: u32, current: usize, max_workers: usize) -> Option<Rescale> {
    let average = window.average()?;
    let required = required_workers(rate, average, max_workers);
    let add = required.saturating_sub(current);
    let interval = tick_interval(rate, current + add);
    Some(Rescale {
        average,
        required,
        add,
        interval,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_tick_interval_single_worker() {
        assert_eq!(tick_interval(60, 1), Duration::from_secs(1));
        assert_eq!(tick_interval(6000, 1), ms(10));
        assert_eq!(tick_interval(1, 1), Duration::from_secs(60));
    }

    #[test]
    fn test_tick_interval_spreads_rate() {
        // 6000/min over 10 workers is 600/min each.
        assert_eq!(tick_interval(6000, 10), ms(100));
        assert_eq!(tick_interval(120, 4), Duration::from_secs(2));
    }

    #[test]
    fn test_tick_interval_never_zero() {
        assert!(tick_interval(u32::MAX, 1) > Duration::ZERO);
    }

    #[test]
    fn test_required_workers_exact_division() {
        // 100 calls/s at 100ms each needs exactly 10 callers.
        assert_eq!(required_workers(6000, ms(100), 50), 10);
        assert_eq!(required_workers(60, Duration::from_secs(1), 50), 1);
    }

    #[test]
    fn test_required_workers_rounds_up() {
        assert_eq!(required_workers(6000, ms(101), 50), 11);
        assert_eq!(required_workers(60, Duration::from_millis(1001), 50), 2);
    }

    #[test]
    fn test_required_workers_capped() {
        assert_eq!(required_workers(6000, Duration::from_secs(1), 50), 50);
        assert_eq!(required_workers(6000, Duration::from_secs(1), 4), 4);
    }

    #[test]
    fn test_required_workers_instant_calls() {
        assert_eq!(required_workers(6000, Duration::ZERO, 50), 1);
    }

    #[test]
    fn test_sample_interval_targets_expected_calls() {
        let config = SchedulerConfig::default();
        // 20 calls at 10ms each
        assert_eq!(sample_interval(6000, &config), ms(200));
        // 20 calls at 1s each
        assert_eq!(sample_interval(60, &config), Duration::from_secs(20));
    }

    #[test]
    fn test_sample_interval_clamped() {
        let config = SchedulerConfig::default();
        assert_eq!(sample_interval(1, &config), Duration::from_secs(60));
        assert_eq!(sample_interval(600_000, &config), ms(100));
    }

    #[test]
    fn test_empty_window_has_no_average() {
        let window = SampleWindow::default();
        assert_eq!(window.average(), None);
        assert_eq!(plan(&window, 6000, 3, 50), None);
    }

    #[test]
    fn test_window_take_resets() {
        let mut window = SampleWindow::default();
        window.record(ms(10));
        window.record(ms(30));
        let taken = window.take();
        assert_eq!(taken.calls, 2);
        assert_eq!(taken.average(), Some(ms(20)));
        assert_eq!(window, SampleWindow::default());
    }

    #[test]
    fn test_plan_grows_pool() {
        let mut window = SampleWindow::default();
        window.record(ms(100));
        let rescale = plan(&window, 6000, 1, 50).unwrap();
        assert_eq!(rescale.required, 10);
        assert_eq!(rescale.add, 9);
        assert_eq!(rescale.interval, ms(100));
        assert_eq!(rescale.workers_after(1), 10);
    }

    #[test]
    fn test_plan_never_shrinks_and_slows_surplus() {
        let mut window = SampleWindow::default();
        window.record(ms(10));
        let rescale = plan(&window, 6000, 10, 50).unwrap();
        assert_eq!(rescale.required, 1);
        assert_eq!(rescale.add, 0);
        // Ten workers keep sharing 6000/min.
        assert_eq!(rescale.interval, ms(100));
        assert_eq!(rescale.workers_after(10), 10);
    }

    #[test]
    fn test_pool_size_monotonic_over_trajectory() {
        let latencies = [100, 10, 300, 5, 50, 1000, 1, 250];
        let mut workers = 1;
        for latency in latencies {
            let mut window = SampleWindow::default();
            window.record(ms(latency));
            let rescale = plan(&window, 6000, workers, 50).unwrap();
            let next = rescale.workers_after(workers);
            assert!(next >= workers);
            assert!(next <= 50);
            workers = next;
        }
        assert_eq!(workers, 50);
    }
}

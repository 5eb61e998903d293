//! Tests for the Scheduler module

use super::aggregator::aggregate_workload_stats;
use super::builder::SchedulerBuilder;
use crate::error::{Error, OpError};
use crate::operation::{CallResult, Operation};
use crate::record::ResultRecord;
use crate::shutdown::Shutdown;
use crate::traits::{Module, NullReporter, Reporter, StaticModule};
use crate::workload::WorkloadStats;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Mock Reporter
// ============================================================================

#[derive(Default)]
struct RecordingReporter {
    records: Mutex<Vec<ResultRecord>>,
}

impl RecordingReporter {
    fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    fn failures(&self) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !r.outcome.is_success())
            .count()
    }
}

impl Reporter for RecordingReporter {
    fn op(&self, record: ResultRecord) {
        self.records.lock().unwrap().push(record);
    }
}

/// Reporter that blocks its calling thread on every record
struct BlockingReporter {
    delay: Duration,
    seen: AtomicUsize,
}

impl Reporter for BlockingReporter {
    fn op(&self, _record: ResultRecord) {
        std::thread::sleep(self.delay);
        self.seen.fetch_add(1, Ordering::SeqCst);
    }
}

/// Reporter whose first call never returns until the test opens the gate
struct StuckReporter {
    gate: Mutex<std::sync::mpsc::Receiver<()>>,
    seen: AtomicUsize,
}

impl StuckReporter {
    fn new() -> (Self, std::sync::mpsc::Sender<()>) {
        let (open, gate) = std::sync::mpsc::channel();
        let reporter = Self {
            gate: Mutex::new(gate),
            seen: AtomicUsize::new(0),
        };
        (reporter, open)
    }
}

impl Reporter for StuckReporter {
    fn op(&self, _record: ResultRecord) {
        // Returns once the sender is dropped.
        let _ = self.gate.lock().unwrap().recv();
        self.seen.fetch_add(1, Ordering::SeqCst);
    }
}

struct PanickingReporter;

impl Reporter for PanickingReporter {
    fn op(&self, _record: ResultRecord) {
        panic!("reporter exploded");
    }
}

// ============================================================================
// Mock Operations
// ============================================================================

fn counting_op(name: &str, rate: u32, invoked: &Arc<AtomicUsize>) -> Operation {
    let invoked = Arc::clone(invoked);
    Operation::new(name, rate, move || {
        let invoked = Arc::clone(&invoked);
        async move {
            invoked.fetch_add(1, Ordering::SeqCst);
            Ok(CallResult::new())
        }
    })
}

fn failing_op(name: &str, rate: u32, invoked: &Arc<AtomicUsize>) -> Operation {
    let invoked = Arc::clone(invoked);
    Operation::new(name, rate, move || {
        let invoked = Arc::clone(&invoked);
        async move {
            invoked.fetch_add(1, Ordering::SeqCst);
            Err(OpError::failed("connection refused"))
        }
    })
}

fn modules(list: Vec<StaticModule>) -> Vec<Arc<dyn Module>> {
    list.into_iter()
        .map(|m| Arc::new(m) as Arc<dyn Module>)
        .collect()
}

// ============================================================================
// Startup validation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_zero_rate_aborts_without_partial_scheduling() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let modules = modules(vec![
        StaticModule::new("kv").with_op(counting_op("get", 600, &invoked)),
        StaticModule::new("queue").with_op(counting_op("push", 0, &invoked)),
    ]);

    let shutdown = Shutdown::new();
    let mut scheduler = SchedulerBuilder::new().build().unwrap();
    let err = scheduler
        .start(shutdown.listener(), &modules, Arc::new(NullReporter))
        .unwrap_err();

    match err {
        Error::ZeroRate { module, operation } => {
            assert_eq!(module, "queue");
            assert_eq!(operation, "push");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(nothing_scheduled(&scheduler));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

fn nothing_scheduled(scheduler: &super::Scheduler) -> bool {
    scheduler.workload_count() == 0 && !scheduler.is_running()
}

#[tokio::test]
async fn test_disabled_zero_rate_operation_is_skipped() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let modules = modules(vec![StaticModule::new("kv")
        .with_op(counting_op("get", 600, &invoked))
        .with_op(counting_op("scan", 0, &invoked).enabled(false))]);

    let shutdown = Shutdown::new();
    let mut scheduler = SchedulerBuilder::new().build().unwrap();
    scheduler
        .start(shutdown.listener(), &modules, Arc::new(NullReporter))
        .unwrap();
    assert_eq!(scheduler.workload_count(), 1);
    assert_eq!(scheduler.stats()[0].operation, "get");

    shutdown.trigger();
    scheduler.await_stop().await;
}

#[tokio::test]
async fn test_nothing_to_schedule() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let modules = modules(vec![
        StaticModule::new("kv").with_op(counting_op("get", 600, &invoked).enabled(false)),
        StaticModule::new("empty"),
    ]);

    let shutdown = Shutdown::new();
    let mut scheduler = SchedulerBuilder::new().build().unwrap();
    let result = scheduler.start(shutdown.listener(), &modules, Arc::new(NullReporter));
    assert!(matches!(result, Err(Error::NothingToSchedule { modules: 2 })));
}

#[tokio::test]
async fn test_no_modules_is_nothing_to_schedule() {
    let shutdown = Shutdown::new();
    let mut scheduler = SchedulerBuilder::new().build().unwrap();
    let result = scheduler.start(shutdown.listener(), &[], Arc::new(NullReporter));
    assert!(matches!(result, Err(Error::NothingToSchedule { modules: 0 })));
}

#[tokio::test]
async fn test_second_start_rejected() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let modules = modules(vec![
        StaticModule::new("kv").with_op(counting_op("get", 600, &invoked))
    ]);

    let shutdown = Shutdown::new();
    let mut scheduler = SchedulerBuilder::new().build().unwrap();
    scheduler
        .start(shutdown.listener(), &modules, Arc::new(NullReporter))
        .unwrap();

    let again = scheduler.start(shutdown.listener(), &modules, Arc::new(NullReporter));
    assert!(matches!(again, Err(Error::AlreadyStarted)));
    assert_eq!(scheduler.workload_count(), 1);

    shutdown.trigger();
    scheduler.await_stop().await;

    let after_stop = scheduler.start(shutdown.listener(), &modules, Arc::new(NullReporter));
    assert!(matches!(after_stop, Err(Error::AlreadyStarted)));
}

#[test]
fn test_validate_modules_matches_start_checks() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let good = modules(vec![StaticModule::new("kv")
        .with_op(counting_op("get", 600, &invoked))
        .with_op(counting_op("put", 60, &invoked))
        .with_op(counting_op("scan", 0, &invoked).enabled(false))]);
    assert_eq!(super::Scheduler::validate_modules(&good).unwrap(), 2);

    let bad = modules(vec![
        StaticModule::new("kv").with_op(counting_op("get", 0, &invoked))
    ]);
    assert!(matches!(
        super::Scheduler::validate_modules(&bad),
        Err(Error::ZeroRate { .. })
    ));
    assert!(matches!(
        super::Scheduler::validate_modules(&[]),
        Err(Error::NothingToSchedule { modules: 0 })
    ));
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_await_stop_without_start_returns_empty() {
    let mut scheduler = SchedulerBuilder::new().build().unwrap();
    let stats = scheduler.await_stop().await;
    assert_eq!(stats.total_workloads, 0);
    assert_eq!(stats.total_calls, 0);
}

// ============================================================================
// Running
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_end_to_end_every_started_call_reported() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let modules = modules(vec![
        StaticModule::new("kv").with_op(counting_op("get", 6000, &invoked))
    ]);
    let reporter = Arc::new(RecordingReporter::default());

    let shutdown = Shutdown::new();
    let mut scheduler = SchedulerBuilder::new().build().unwrap();
    scheduler
        .start(shutdown.listener(), &modules, reporter.clone())
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.trigger();
    let stats = scheduler.await_stop().await;

    let calls = invoked.load(Ordering::SeqCst);
    assert!(calls >= 1);
    assert_eq!(reporter.len(), calls);
    assert_eq!(stats.total_calls, calls as u64);
    assert_eq!(stats.total_forwarded, calls as u64);
    assert_eq!(stats.total_dropped, 0);
    assert!(!scheduler.is_running());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(invoked.load(Ordering::SeqCst), calls);
    assert_eq!(reporter.len(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_failures_forwarded_and_counted() {
    let ok = Arc::new(AtomicUsize::new(0));
    let bad = Arc::new(AtomicUsize::new(0));
    let modules = modules(vec![StaticModule::new("kv")
        .with_op(counting_op("get", 600, &ok))
        .with_op(failing_op("put", 600, &bad))]);
    let reporter = Arc::new(RecordingReporter::default());

    let shutdown = Shutdown::new();
    let mut scheduler = SchedulerBuilder::new().build().unwrap();
    scheduler
        .start(shutdown.listener(), &modules, reporter.clone())
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1050)).await;
    shutdown.trigger();
    let stats = scheduler.await_stop().await;

    let failures = bad.load(Ordering::SeqCst);
    assert_eq!(failures, 10);
    assert_eq!(reporter.failures(), failures);
    assert_eq!(stats.total_errors, failures as u64);
    assert_eq!(stats.total_calls, (failures + ok.load(Ordering::SeqCst)) as u64);

    let put = stats
        .workloads
        .iter()
        .find(|w| w.operation == "put")
        .expect("put workload missing");
    assert_eq!(put.errors, put.calls);
    assert_eq!(put.target_rate, 600);
}

#[tokio::test(start_paused = true)]
async fn test_live_stats_published() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let modules = modules(vec![
        StaticModule::new("kv").with_op(counting_op("get", 6000, &invoked))
    ]);

    let shutdown = Shutdown::new();
    let mut scheduler = SchedulerBuilder::new().build().unwrap();
    scheduler
        .start(shutdown.listener(), &modules, Arc::new(NullReporter))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(450)).await;
    let live: Vec<WorkloadStats> = scheduler.stats();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].module, "kv");
    assert_eq!(live[0].workers, 1);
    assert!(live[0].calls > 0);
    assert_eq!(live[0].rescales, 2);
    assert!(!live[0].stopped);

    shutdown.trigger();
    scheduler.await_stop().await;
    assert!(scheduler.stats()[0].stopped);
}

#[tokio::test(start_paused = true)]
async fn test_independent_schedulers() {
    let first_calls = Arc::new(AtomicUsize::new(0));
    let second_calls = Arc::new(AtomicUsize::new(0));
    let first_modules = modules(vec![
        StaticModule::new("a").with_op(counting_op("op", 600, &first_calls))
    ]);
    let second_modules = modules(vec![
        StaticModule::new("b").with_op(counting_op("op", 600, &second_calls))
    ]);

    let first_shutdown = Shutdown::new();
    let second_shutdown = Shutdown::new();
    let mut first = SchedulerBuilder::new().build().unwrap();
    let mut second = SchedulerBuilder::new().build().unwrap();
    first
        .start(first_shutdown.listener(), &first_modules, Arc::new(NullReporter))
        .unwrap();
    second
        .start(second_shutdown.listener(), &second_modules, Arc::new(NullReporter))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(550)).await;
    first_shutdown.trigger();
    first.await_stop().await;
    let first_at_stop = first_calls.load(Ordering::SeqCst);
    let second_at_stop = second_calls.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(first_calls.load(Ordering::SeqCst), first_at_stop);
    assert!(second_calls.load(Ordering::SeqCst) > second_at_stop);
    assert!(second.is_running());

    second_shutdown.trigger();
    second.await_stop().await;
}

// ============================================================================
// Reporter isolation
// ============================================================================

// The reporter tests below run on the default current-thread runtime with a
// real clock: a reporter blocking the only runtime thread would stop every
// worker.

#[tokio::test]
async fn test_slow_reporter_does_not_slow_ticks() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let modules = modules(vec![
        StaticModule::new("kv").with_op(counting_op("get", 6000, &invoked))
    ]);
    let reporter = Arc::new(BlockingReporter {
        delay: Duration::from_millis(200),
        seen: AtomicUsize::new(0),
    });

    let shutdown = Shutdown::new();
    let mut scheduler = SchedulerBuilder::new()
        .drain_timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    scheduler
        .start(shutdown.listener(), &modules, reporter.clone())
        .unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    let calls = invoked.load(Ordering::SeqCst);
    assert!(calls >= 50, "only {calls} calls in 1s at 100 calls/s");

    shutdown.trigger();
    let stats = tokio::time::timeout(Duration::from_secs(5), scheduler.await_stop())
        .await
        .expect("scheduler failed to stop behind a slow reporter");

    // Five records per second reach the reporter; the rest are abandoned.
    assert!(stats.total_undelivered > 0);
    assert_eq!(
        stats.total_forwarded + stats.total_undelivered + stats.total_dropped,
        stats.total_calls
    );

    // Only the call already inside the reporter may still complete.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(reporter.seen.load(Ordering::SeqCst) as u64 <= stats.total_forwarded + 1);
}

#[tokio::test]
async fn test_blocking_reporter_drops_instead_of_stalling() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let modules = modules(vec![
        StaticModule::new("kv").with_op(counting_op("get", 6000, &invoked))
    ]);
    let reporter = Arc::new(BlockingReporter {
        delay: Duration::from_millis(50),
        seen: AtomicUsize::new(0),
    });

    let shutdown = Shutdown::new();
    let mut scheduler = SchedulerBuilder::new()
        .result_buffer(2)
        .submit_timeout(Duration::from_millis(5))
        .build()
        .unwrap();
    scheduler
        .start(shutdown.listener(), &modules, reporter.clone())
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown.trigger();
    let stats = tokio::time::timeout(Duration::from_secs(5), scheduler.await_stop())
        .await
        .expect("scheduler failed to drain behind a blocking reporter");

    assert!(stats.total_dropped > 0);
    assert_eq!(stats.total_undelivered, 0);
    assert_eq!(
        stats.total_forwarded + stats.total_dropped,
        stats.total_calls
    );
    assert_eq!(reporter.seen.load(Ordering::SeqCst) as u64, stats.total_forwarded);
}

#[tokio::test]
async fn test_stuck_reporter_does_not_block_stop() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let modules = modules(vec![
        StaticModule::new("kv").with_op(counting_op("get", 6000, &invoked))
    ]);
    let (reporter, open_gate) = StuckReporter::new();
    let reporter = Arc::new(reporter);

    let shutdown = Shutdown::new();
    let mut scheduler = SchedulerBuilder::new()
        .drain_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    scheduler
        .start(shutdown.listener(), &modules, reporter.clone())
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown.trigger();
    let stats = tokio::time::timeout(Duration::from_secs(3), scheduler.await_stop())
        .await
        .expect("await_stop hung behind a stuck reporter");

    assert!(stats.total_calls > 0);
    assert_eq!(stats.total_calls, invoked.load(Ordering::SeqCst) as u64);
    assert_eq!(stats.total_forwarded, 0);
    assert_eq!(stats.total_dropped, 0);
    assert_eq!(stats.total_undelivered, stats.total_calls);
    assert!(!scheduler.is_running());

    // Releasing the stuck call delivers nothing else.
    drop(open_gate);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(reporter.seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_panicking_reporter_does_not_stop_workers() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let modules = modules(vec![
        StaticModule::new("kv").with_op(counting_op("get", 6000, &invoked))
    ]);

    let shutdown = Shutdown::new();
    let mut scheduler = SchedulerBuilder::new().build().unwrap();
    scheduler
        .start(shutdown.listener(), &modules, Arc::new(PanickingReporter))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let early = invoked.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(invoked.load(Ordering::SeqCst) > early);

    shutdown.trigger();
    let stats = tokio::time::timeout(Duration::from_secs(3), scheduler.await_stop())
        .await
        .expect("scheduler failed to stop after reporter panic");
    assert_eq!(stats.total_forwarded, 0);
    assert_eq!(
        stats.total_dropped + stats.total_undelivered,
        stats.total_calls
    );
}

// ============================================================================
// Aggregation
// ============================================================================

#[test]
fn test_aggregate_empty() {
    let stats = aggregate_workload_stats(&[], Duration::from_secs(3));
    assert_eq!(stats.total_workloads, 0);
    assert_eq!(stats.total_duration, Duration::from_secs(3));
    assert_eq!(stats.success_rate(), 0.0);
}

#[test]
fn test_aggregate_workloads() {
    let mut a = WorkloadStats::new("kv", "get", 600, Duration::from_secs(2));
    a.workers = 3;
    a.calls = 100;
    a.errors = 10;
    let mut b = WorkloadStats::new("kv", "put", 60, Duration::from_secs(20));
    b.workers = 1;
    b.calls = 20;
    b.dropped_results = 2;

    let stats = aggregate_workload_stats(&[a, b], Duration::from_secs(60));
    assert_eq!(stats.total_workloads, 2);
    assert_eq!(stats.total_workers, 4);
    assert_eq!(stats.total_calls, 120);
    assert_eq!(stats.total_errors, 10);
    assert_eq!(stats.total_dropped, 2);
    assert_eq!(stats.total_successes(), 110);
    assert!((stats.calls_per_minute - 120.0).abs() < 1e-9);
    assert!((stats.error_rate() - 10.0 / 120.0).abs() < 1e-9);
}

//! CLI argument parsing and command dispatch

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::time::{interval_at, Instant};

use opbench_core::{AggregatedStats, Scheduler, Shutdown};
use opbench_modules::{SyntheticModuleConfig, SyntheticOpConfig};
use opbench_report::{Report, StatsReporter};

use crate::plan::{parse_latency, RunPlan};

#[derive(Parser, Debug)]
#[command(name = "opbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive operations at their target rates until stopped
    Run(RunArgs),
    /// Check a plan file without running it
    Validate {
        /// Path to the JSON run plan
        #[arg(short, long, env = "OPBENCH_PLAN")]
        plan: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON run plan; without one, a single synthetic operation is built
    /// from the flags below
    #[arg(short, long, env = "OPBENCH_PLAN")]
    pub plan: Option<PathBuf>,

    /// Stop after this long (e.g. "30s", "5m"); runs until Ctrl+C otherwise
    #[arg(short, long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Write the JSON report to this path
    #[arg(short, long, env = "OPBENCH_OUTPUT")]
    pub output: Option<PathBuf>,

    /// How often to log live workload statistics
    #[arg(long, value_parser = parse_duration, default_value = "10s")]
    pub progress: Duration,

    /// Override the per-operation worker ceiling
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Module name for the single-operation plan
    #[arg(long, default_value = "synthetic")]
    pub module: String,

    /// Operation name for the single-operation plan
    #[arg(long, default_value = "op")]
    pub operation: String,

    /// Target rate in calls per minute
    #[arg(short, long, default_value_t = 600)]
    pub rate: u32,

    /// Latency profile in ms: D(fixed), U(min,max) or N(mean,std)
    #[arg(short, long, default_value = "D(10)")]
    pub latency: String,

    /// Probability that a call fails (0.0 - 1.0)
    #[arg(long, default_value_t = 0.0)]
    pub error_rate: f64,

    /// Report sampled latency as the call duration instead of sleeping
    #[arg(long)]
    pub report_latency: bool,
}

/// Parse a positive human-readable duration such as "500ms" or "2m"
fn parse_duration(value: &str) -> std::result::Result<Duration, String> {
    let duration = humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())?;
    if duration.is_zero() {
        return Err("duration must be greater than zero".into());
    }
    Ok(duration)
}

impl RunArgs {
    /// Resolve the plan file or the single-operation flags into a plan
    pub fn plan(&self) -> Result<RunPlan> {
        let mut plan = match &self.plan {
            Some(path) => RunPlan::from_file(path)?,
            None => {
                let latency = parse_latency(&self.latency)
                    .with_context(|| format!("Failed to parse latency: {}", self.latency))?;
                let op = SyntheticOpConfig::new(&self.operation, self.rate)
                    .with_latency(latency)
                    .with_error_rate(self.error_rate)
                    .with_report_latency(self.report_latency);
                RunPlan::new(vec![SyntheticModuleConfig::new(&self.module).with_op(op)])
            }
        };

        if self.duration.is_some() {
            plan.duration = self.duration;
        }
        if let Some(max) = self.max_workers {
            plan.scheduler.max_workers_per_operation = max;
        }

        Ok(plan)
    }
}

impl Cli {
    /// Dispatch the selected command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Run(args) => run(args).await,
            Commands::Validate { plan } => validate(&plan),
        }
    }
}

fn validate(path: &Path) -> Result<()> {
    let plan = RunPlan::from_file(path)?;
    let operations = plan.validate()?;
    println!(
        "✓ {}: {} module(s), {} operation(s) to schedule",
        path.display(),
        plan.modules.len(),
        operations
    );
    Ok(())
}

async fn run(args: RunArgs) -> Result<()> {
    let plan = args.plan()?;
    let modules = plan.build_modules()?;
    let mut scheduler = plan.build_scheduler()?;
    let reporter =
        Arc::new(StatsReporter::spawn().context("Failed to start statistics reporter")?);

    let shutdown = Shutdown::new();
    scheduler
        .start(shutdown.listener(), &modules, reporter.clone())
        .context("Failed to start scheduler")?;

    println!("\n{}", "=".repeat(70));
    println!("   opbench - adaptive rate-controlled load");
    println!("{}", "=".repeat(70));
    for module in &plan.modules {
        for op in module.ops.iter().filter(|op| op.enabled) {
            println!("  {}/{}: {} calls/min", module.name, op.name, op.rate);
        }
    }
    match plan.duration {
        Some(d) => println!("  Duration: {}", humantime_serde::re::humantime::format_duration(d)),
        None => println!("  Duration: until Ctrl+C"),
    }
    println!("{}\n", "=".repeat(70));

    wait_for_stop(&scheduler, plan.duration, args.progress).await;
    shutdown.trigger();

    let stats = scheduler.await_stop().await;
    let report = reporter
        .finish()
        .await
        .context("Failed to collect final statistics")?;

    print_results(&stats, &report);

    if let Some(path) = &args.output {
        report
            .write_json(path)
            .with_context(|| format!("Failed to export JSON to: {}", path.display()))?;
        println!("✓ JSON report written to: {}", path.display());
    }

    Ok(())
}

/// Wait for Ctrl+C or the run duration, logging progress meanwhile
async fn wait_for_stop(scheduler: &Scheduler, duration: Option<Duration>, progress: Duration) {
    let deadline = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ctrl_c_live = true;

    let mut ticker = interval_at(Instant::now() + progress, progress);

    loop {
        tokio::select! {
            result = &mut ctrl_c, if ctrl_c_live => match result {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                    ctrl_c_live = false;
                }
            },

            _ = &mut deadline => {
                tracing::info!("Duration reached, initiating shutdown...");
                break;
            }

            _ = ticker.tick() => log_progress(scheduler),
        }
    }
}

fn log_progress(scheduler: &Scheduler) {
    for stats in scheduler.stats() {
        tracing::info!(
            module = %stats.module,
            operation = %stats.operation,
            workers = stats.workers,
            interval_ms = stats.tick_interval.as_secs_f64() * 1000.0,
            calls = stats.calls,
            errors = stats.errors,
            dropped = stats.dropped_results,
            "Workload progress"
        );
    }
}

fn print_results(stats: &AggregatedStats, report: &Report) {
    println!("\n{}", "=".repeat(70));
    println!("   Results");
    println!("{}", "=".repeat(70));
    println!();
    println!("Scheduler:");
    println!("  Elapsed:              {:.1} s", stats.total_duration.as_secs_f64());
    println!("  Calls:                {}", stats.total_calls);
    println!(
        "  Failed:               {} ({:.1}%)",
        stats.total_errors,
        stats.error_rate() * 100.0
    );
    println!("  Dropped results:      {}", stats.total_dropped);
    if stats.total_undelivered > 0 {
        println!("  Undelivered results:  {}", stats.total_undelivered);
    }
    println!("  Achieved rate:        {:.1} calls/min", stats.calls_per_minute);
    println!();

    for workload in &stats.workloads {
        println!(
            "  {}/{}: {} worker(s) at {:.2} ms, {} rescale(s), target {} calls/min",
            workload.module,
            workload.operation,
            workload.workers,
            workload.tick_interval.as_secs_f64() * 1000.0,
            workload.rescales,
            workload.target_rate
        );
    }
    println!();
    println!("{report}");
    println!("{}", "=".repeat(70));
}

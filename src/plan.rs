//! Run plans: what to schedule and how

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use opbench_core::{ChannelConfig, Module, Scheduler, SchedulerBuilder, SchedulerConfig};
use opbench_modules::{LatencyProfile, SyntheticModule, SyntheticModuleConfig};

/// A complete run description, usually loaded from a JSON file
///
/// ```json
/// {
///   "duration": "30s",
///   "scheduler": { "max_workers_per_operation": 20 },
///   "modules": [
///     { "name": "kv", "ops": [
///       { "name": "get", "rate": 6000,
///         "latency": { "kind": "normal", "mean": "20ms", "std_dev": "5ms" } }
///     ]}
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPlan {
    /// How long to run; until Ctrl+C if absent
    #[serde(default, with = "humantime_serde")]
    pub duration: Option<Duration>,

    /// Worker pool and sampling configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Reporter handoff configuration
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Modules to schedule
    pub modules: Vec<SyntheticModuleConfig>,
}

impl RunPlan {
    /// A plan with default configuration and the given modules
    pub fn new(modules: Vec<SyntheticModuleConfig>) -> Self {
        Self {
            duration: None,
            scheduler: SchedulerConfig::default(),
            channel: ChannelConfig::default(),
            modules,
        }
    }

    /// Load a plan from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse plan file: {}", path.display()))
    }

    /// Instantiate every module of the plan
    pub fn build_modules(&self) -> Result<Vec<Arc<dyn Module>>> {
        self.modules
            .iter()
            .map(|config| {
                SyntheticModule::from_config(config)
                    .map(|m| Arc::new(m) as Arc<dyn Module>)
                    .with_context(|| format!("Invalid module definition: {}", config.name))
            })
            .collect()
    }

    /// Build a scheduler from the plan's configuration
    pub fn build_scheduler(&self) -> Result<Scheduler> {
        SchedulerBuilder::new()
            .config(self.scheduler.clone())
            .channel_config(self.channel.clone())
            .build()
            .context("Invalid scheduler configuration")
    }

    /// Run every startup check without starting anything
    ///
    /// Returns the number of operations that would be scheduled.
    pub fn validate(&self) -> Result<usize> {
        self.build_scheduler()?;
        let modules = self.build_modules()?;
        Scheduler::validate_modules(&modules).context("Plan cannot be scheduled")
    }
}

/// Parse a latency shorthand (milliseconds)
///
/// - `D(10)`: fixed 10 ms
/// - `U(5,15)`: uniform between 5 and 15 ms
/// - `N(20,5)`: normal with mean 20 ms and standard deviation 5 ms
pub fn parse_latency(input: &str) -> Result<LatencyProfile> {
    let input = input.trim();
    let (kind, params) = input
        .split_once('(')
        .and_then(|(kind, rest)| rest.strip_suffix(')').map(|params| (kind, params)))
        .ok_or_else(|| {
            anyhow::anyhow!("Invalid latency format: {input}. Expected D(ms), U(min,max) or N(mean,std)")
        })?;

    let values = params
        .split(',')
        .map(|p| {
            let p = p.trim();
            p.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .ok_or_else(|| anyhow::anyhow!("Invalid latency value: {p}"))
        })
        .collect::<Result<Vec<f64>>>()?;

    let ms = |v: f64| Duration::from_micros((v * 1000.0).round() as u64);

    match (kind.to_ascii_uppercase().as_str(), values.as_slice()) {
        ("D", [latency]) => Ok(LatencyProfile::Fixed { latency: ms(*latency) }),
        ("U", [min, max]) => Ok(LatencyProfile::Uniform {
            min: ms(*min),
            max: ms(*max),
        }),
        ("N", [mean, std_dev]) => Ok(LatencyProfile::Normal {
            mean: ms(*mean),
            std_dev: ms(*std_dev),
        }),
        ("D", _) => anyhow::bail!("Fixed latency takes 1 parameter: D(ms), got: {input}"),
        ("U", _) => anyhow::bail!("Uniform latency takes 2 parameters: U(min,max), got: {input}"),
        ("N", _) => anyhow::bail!("Normal latency takes 2 parameters: N(mean,std), got: {input}"),
        _ => anyhow::bail!("Unknown latency kind in {input}. Expected D, U or N"),
    }
}

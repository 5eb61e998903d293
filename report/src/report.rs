//! Report snapshot, JSON export and summary table

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::histogram::LatencyPercentiles;

/// Figures for one (module, operation) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpSummary {
    /// Module name
    pub module: String,
    /// Operation name
    pub operation: String,
    /// Calls seen, successful or not
    pub executions: u64,
    /// Failed calls
    pub errors: u64,
    /// Error rate (0.0 - 1.0)
    pub error_rate: f64,
    /// Mean successful duration (ms)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub average_ms: Option<f64>,
    /// Shortest successful duration (ms)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub shortest_ms: Option<f64>,
    /// Longest successful duration (ms)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub longest_ms: Option<f64>,
    /// Successful duration percentiles
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub percentiles: Option<LatencyPercentiles>,
    /// Most recent error message
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_error: Option<String>,
}

/// Everything the reporter knows at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// When the reporter started
    pub started_at: DateTime<Utc>,
    /// When this report was taken
    pub generated_at: DateTime<Utc>,
    /// Calls across all operations
    pub total_executions: u64,
    /// Failed calls across all operations
    pub total_errors: u64,
    /// Per-operation figures, sorted by module then operation
    pub operations: Vec<OpSummary>,
}

impl Report {
    /// Look up one operation's figures
    pub fn find(&self, module: &str, operation: &str) -> Option<&OpSummary> {
        self.operations
            .iter()
            .find(|s| s.module == module && s.operation == operation)
    }

    /// Seconds between reporter start and this report
    pub fn elapsed_secs(&self) -> f64 {
        (self.generated_at - self.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as JSON to `path`
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        tracing::debug!(path = %path.as_ref().display(), "Report written");
        Ok(())
    }

    /// Read a report previously written with [`Report::write_json`]
    pub fn read_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<16} {:<20} {:>10} {:>8} {:>7} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "MODULE", "OPERATION", "EXECS", "ERRORS", "ERR%", "AVG ms", "MIN ms", "MAX ms", "P50 ms", "P99 ms"
        )?;
        for op in &self.operations {
            writeln!(
                f,
                "{:<16} {:<20} {:>10} {:>8} {:>7.2} {:>10} {:>10} {:>10} {:>10} {:>10}",
                op.module,
                op.operation,
                op.executions,
                op.errors,
                op.error_rate * 100.0,
                cell(op.average_ms),
                cell(op.shortest_ms),
                cell(op.longest_ms),
                cell(op.percentiles.map(|p| p.p50)),
                cell(op.percentiles.map(|p| p.p99)),
            )?;
        }
        write!(
            f,
            "{} calls, {} errors over {:.1}s",
            self.total_executions,
            self.total_errors,
            self.elapsed_secs()
        )
    }
}

//! Per-call result records handed to the reporter

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

/// Outcome of one operation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    /// The call succeeded and took `duration`
    Success {
        /// Measured or overridden duration
        duration: Duration,
    },
    /// The call failed; no timing is attached
    Failure {
        /// Rendered error message
        error: String,
    },
}

impl CallOutcome {
    /// Check if the call succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success { .. })
    }

    /// Duration of a successful call
    pub fn duration(&self) -> Option<Duration> {
        match self {
            CallOutcome::Success { duration } => Some(*duration),
            CallOutcome::Failure { .. } => None,
        }
    }
}

/// One record per completed call
///
/// Module and operation names are shared with the owning workload so a record
/// costs two reference-count bumps rather than two string copies.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecord {
    /// Module that owns the operation
    pub module: Arc<str>,
    /// Operation name
    pub operation: Arc<str>,
    /// What happened
    pub outcome: CallOutcome,
    /// When the call completed
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ResultRecord {
    /// Record a successful call
    pub fn success(module: Arc<str>, operation: Arc<str>, duration: Duration) -> Self {
        Self {
            module,
            operation,
            outcome: CallOutcome::Success { duration },
            timestamp: chrono::Utc::now(),
        }
    }

    /// Record a failed call
    pub fn failure(module: Arc<str>, operation: Arc<str>, error: impl ToString) -> Self {
        Self {
            module,
            operation,
            outcome: CallOutcome::Failure {
                error: error.to_string(),
            },
            timestamp: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpError;

    #[test]
    fn test_success_record() {
        let record = ResultRecord::success("kv".into(), "get".into(), Duration::from_millis(3));
        assert!(record.outcome.is_success());
        assert_eq!(record.outcome.duration(), Some(Duration::from_millis(3)));
        assert_eq!(&*record.module, "kv");
    }

    #[test]
    fn test_failure_record_has_no_duration() {
        let record = ResultRecord::failure("kv".into(), "put".into(), OpError::failed("refused"));
        assert!(!record.outcome.is_success());
        assert_eq!(record.outcome.duration(), None);
        assert_eq!(
            record.outcome,
            CallOutcome::Failure {
                error: "refused".into()
            }
        );
    }

    #[test]
    fn test_outcome_json_format() {
        let outcome = CallOutcome::Failure {
            error: "boom".into(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"status\":\"failure\""));
        assert!(json.contains("\"error\":\"boom\""));
    }
}

//! Operations: named, rate-tagged units of work

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::OpError;

/// What a successful invocation hands back to the scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallResult {
    /// Caller-measured duration, used instead of the scheduler's wall clock
    pub duration: Option<Duration>,
}

impl CallResult {
    /// A result with no duration override
    pub fn new() -> Self {
        Self::default()
    }

    /// A result carrying its own measured duration
    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
        }
    }
}

/// The invocation function behind an [`Operation`]
///
/// Implemented for any `Fn() -> impl Future<Output = Result<CallResult, OpError>>`,
/// so plain async closures work.
#[async_trait]
pub trait Invoke: Send + Sync {
    /// Perform one call
    async fn invoke(&self) -> Result<CallResult, OpError>;
}

#[async_trait]
impl<F, Fut> Invoke for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CallResult, OpError>> + Send + 'static,
{
    async fn invoke(&self) -> Result<CallResult, OpError> {
        (self)().await
    }
}

/// A named unit of work with a target invocation rate
///
/// `rate` is expressed in calls per minute. The name and invocation are fixed
/// at construction; `rate` and `enabled` may be adjusted until the operation
/// is handed to a scheduler, which takes its own copy.
#[derive(Clone)]
pub struct Operation {
    name: String,
    rate: u32,
    enabled: bool,
    invoke: Arc<dyn Invoke>,
}

impl Operation {
    /// Create an enabled operation
    pub fn new(name: impl Into<String>, rate: u32, invoke: impl Invoke + 'static) -> Self {
        Self {
            name: name.into(),
            rate,
            enabled: true,
            invoke: Arc::new(invoke),
        }
    }

    /// Create an operation from an already shared invoker
    pub fn from_shared(name: impl Into<String>, rate: u32, invoke: Arc<dyn Invoke>) -> Self {
        Self {
            name: name.into(),
            rate,
            enabled: true,
            invoke,
        }
    }

    /// Builder-style variant of [`Operation::set_enabled`]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder-style variant of [`Operation::set_rate`]
    pub fn with_rate(mut self, rate: u32) -> Self {
        self.rate = rate;
        self
    }

    /// Operation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target rate in calls per minute
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Whether the operation should be scheduled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the operation
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Change the target rate
    pub fn set_rate(&mut self, rate: u32) {
        self.rate = rate;
    }

    /// Invoke the operation once
    pub async fn invoke(&self) -> Result<CallResult, OpError> {
        self.invoke.invoke().await
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("rate", &self.rate)
            .field("enabled", &self.enabled)
            .finish()
    }
}

//! Process-wide cooperative cancellation
//!
//! A single [`Shutdown`] is triggered once and observed by the scheduler,
//! every workload and every worker at the same time. Listeners subscribed
//! after the trigger still see it, so workers spawned late in a run can never
//! miss the signal.

use tokio::sync::watch;

/// Cancellation trigger
///
/// Cloning shares the same underlying signal. Dropping every `Shutdown`
/// handle without triggering also cancels all listeners, mirroring a closed
/// broadcast channel.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create a new, untriggered signal
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    /// Raise the signal. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the signal has been raised
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Subscribe a new listener
    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a [`Shutdown`]
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Whether cancellation has been observed
    pub fn is_cancelled(&self) -> bool {
        // A closed sender with no trigger still means nobody can keep us running.
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Wait until cancellation is raised
    ///
    /// Returns immediately if it already was. Cancel-safe, so it can sit in a
    /// `tokio::select!` next to a timer.
    pub async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}

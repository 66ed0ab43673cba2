use std::time::Duration;
use tokio::time::Instant;

/// Debounce timer with at most one pending deadline.
///
/// Every [`arm`](Self::arm) replaces the previous deadline. [`fired`](Self::fired) completes once
/// per armed deadline and is cancel-safe, so it can sit in a `tokio::select!` next to the edit
/// stream.
#[derive(Debug)]
pub struct TriggerScheduler {
    pause: Duration,
    deadline: Option<Instant>,
}

impl TriggerScheduler {
    #[must_use]
    pub const fn new(pause: Duration) -> Self {
        Self {
            pause,
            deadline: None,
        }
    }

    /// Cancel any pending deadline and start a new quiet period.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.pause);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Wait for the pending deadline, then disarm. Never completes while disarmed.
    pub async fn fired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

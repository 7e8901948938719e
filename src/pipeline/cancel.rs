//! Cooperative cancellation for validation runs

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Cloneable cancellation flag. Cancelling any clone cancels them all.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once the signal is cancelled; immediately if it already is
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }

    /// Cancels the signal after `delay` from a background task
    pub fn cancel_after(&self, delay: Duration) {
        let signal = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            signal.cancel();
        });
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_wakes_waiters() {
        let signal = CancellationSignal::new();
        assert!(!signal.is_cancelled());

        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.cancelled().await })
        };

        signal.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_already_cancelled_resolves_immediately() {
        let signal = CancellationSignal::new();
        signal.cancel();
        tokio::time::timeout(Duration::from_millis(100), signal.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_after() {
        let signal = CancellationSignal::new();
        signal.cancel_after(Duration::from_millis(20));
        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .unwrap();
    }
}

//! Broadcastable shutdown signalling.
//!
//! A [`ShutdownController`] / [`ShutdownListener`] pair replaces the shared
//! "running" boolean that byte-pump loops would otherwise have to poll. The
//! controller side triggers at most one transition (not triggered to
//! triggered); every listener clone observes it, and a parked listener is
//! woken immediately, so a pump blocked on `select!` exits without waiting
//! for a read timeout.
//!
//! Built on `tokio::sync::watch`: cheap to clone, level-triggered, and safe
//! to check after the fact with [`ShutdownListener::is_triggered`].

use tokio::sync::watch;

/// The triggering half of a shutdown signal.
///
/// Owned by whoever decides the lifetime: the session coordinator for
/// session-local shutdown, the engine for process-wide shutdown. Clones
/// trigger the same signal, so a signal handler can hold its own handle.
#[derive(Debug, Clone)]
pub struct ShutdownController {
    tx: watch::Sender<bool>,
}

/// The observing half of a shutdown signal. Clone freely; every clone sees
/// the same trigger.
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownController {
    /// Creates a controller and its first listener.
    pub fn new() -> (Self, ShutdownListener) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, ShutdownListener { rx })
    }

    /// Signals shutdown. Idempotent; listeners that already exited are fine.
    pub fn trigger(&self) {
        // send only fails when every listener is gone, which is harmless here.
        let _ = self.tx.send(true);
    }

    /// Creates an additional listener bound to this controller.
    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl ShutdownListener {
    /// Non-blocking check, for loop guards.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been triggered. Resolves immediately if it
    /// already was. A dropped controller counts as triggered, so listeners
    /// can never be left parked forever.
    pub async fn triggered(&mut self) {
        // wait_for resolves on the current value as well, covering the
        // already-triggered case without a separate borrow check.
        if self.rx.wait_for(|triggered| *triggered).await.is_err() {
            // Controller dropped: treat as shutdown.
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_trigger_wakes_a_parked_listener() {
        let (controller, mut listener) = ShutdownController::new();

        let waiter = tokio::spawn(async move {
            listener.triggered().await;
        });

        controller.trigger();
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("listener must wake after trigger")
            .unwrap();
    }

    #[tokio::test]
    async fn test_listener_created_after_trigger_resolves_immediately() {
        let (controller, _first) = ShutdownController::new();
        controller.trigger();

        let mut late = controller.listener();
        assert!(late.is_triggered());
        timeout(Duration::from_millis(100), late.triggered())
            .await
            .expect("already-triggered listener must not block");
    }

    #[tokio::test]
    async fn test_is_triggered_starts_false() {
        let (_controller, listener) = ShutdownController::new();
        assert!(!listener.is_triggered());
    }

    #[tokio::test]
    async fn test_all_clones_observe_the_trigger() {
        let (controller, listener) = ShutdownController::new();
        let mut a = listener.clone();
        let mut b = listener;

        controller.trigger();

        timeout(Duration::from_millis(100), a.triggered()).await.unwrap();
        timeout(Duration::from_millis(100), b.triggered()).await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_controller_counts_as_shutdown() {
        let (controller, mut listener) = ShutdownController::new();
        drop(controller);

        timeout(Duration::from_millis(100), listener.triggered())
            .await
            .expect("listener must not park forever after controller drop");
    }
}

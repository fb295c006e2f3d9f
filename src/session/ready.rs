//! Readiness signaling for session drivers.
//!
//! The protocol-advancing path marks the gate once the handshake has
//! completed; callers block on [`ReadyGate::wait`] with a deadline.
//! Waiting never advances the protocol; someone else must keep driving
//! the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use crate::core::error::SessionError;

/// One-shot readiness flag with wakeup.
#[derive(Debug, Default)]
pub struct ReadyGate {
    ready: AtomicBool,
    notify: Notify,
}

impl ReadyGate {
    /// Create a gate in the not-ready state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking readiness check.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Mark ready and wake all waiters. Idempotent.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Wait until the gate is marked ready, up to `timeout`.
    ///
    /// Timing out is a [`SessionError::ReadyTimeout`], distinct from any
    /// protocol failure; the session itself is unaffected.
    pub async fn wait(&self, timeout: Duration) -> Result<(), SessionError> {
        tokio::time::timeout(timeout, self.wait_marked())
            .await
            .map_err(|_| SessionError::ReadyTimeout)
    }

    async fn wait_marked(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        loop {
            if self.is_ready() {
                return;
            }
            // Register before the re-check so a concurrent mark_ready
            // between check and await cannot be missed.
            notified.as_mut().enable();
            if self.is_ready() {
                return;
            }
            notified.as_mut().await;
            notified.set(self.notify.notified());
        }
    }
}

//! The readiness gate.
//!
//! A single-slot latch between the orchestrator and request handling. A
//! compile cycle arms the gate before touching the server bundle and opens it
//! once the rebuilt module is ready; requests arriving in between wait on
//! [`ReadyGate::wait_open`] instead of being served against a half-replaced
//! module.
//!
//! At most one gate is pending per process: [`ReadyGate::arm`] refuses while
//! a previous cycle is still unresolved, which is how overlapping compile
//! cycles are suppressed.

use parking_lot::Mutex;
use tokio::sync::watch;

/// Single-slot readiness latch.
pub struct ReadyGate {
    /// True between `arm()` and `open()`.
    pending: Mutex<bool>,
    open: watch::Sender<bool>,
}

impl ReadyGate {
    /// A new gate starts closed and unarmed; the initial startup cycle arms
    /// and opens it like any other.
    pub fn new() -> Self {
        let (open, _) = watch::channel(false);
        ReadyGate {
            pending: Mutex::new(false),
            open,
        }
    }

    /// Arm the gate for a new compile cycle.
    ///
    /// Returns false when a previous gate is still pending; the caller must
    /// not start a new cycle in that case.
    pub fn arm(&self) -> bool {
        let mut pending = self.pending.lock();
        if *pending {
            return false;
        }
        *pending = true;
        // send succeeds even with no receivers subscribed yet
        let _ = self.open.send(false);
        true
    }

    /// Resolve the pending gate; all current and future waiters proceed.
    pub fn open(&self) {
        *self.pending.lock() = false;
        let _ = self.open.send(true);
    }

    /// Whether a cycle is in flight.
    pub fn is_pending(&self) -> bool {
        *self.pending.lock()
    }

    /// Wait until the gate is open. Returns immediately when it already is.
    pub async fn wait_open(&self) {
        let mut rx = self.open.subscribe();
        // The sender lives as long as self, so the channel cannot close here.
        let _ = rx.wait_for(|open| *open).await;
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

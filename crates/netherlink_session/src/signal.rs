//! One-shot disconnect signal.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A one-shot flag carrying the disconnect reason.
///
/// Set at most once; every current and future waiter observes the same
/// terminal reason.
pub struct DisconnectSignal {
    reason: Mutex<Option<String>>,
    signaled: Condvar,
}

impl DisconnectSignal {
    /// An unset signal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reason: Mutex::new(None),
            signaled: Condvar::new(),
        }
    }

    /// Sets the reason; returns `false` (and changes nothing) when the
    /// signal was already set.
    pub fn set(&self, reason: &str) -> bool {
        let mut slot = self.reason.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(reason.to_string());
        self.signaled.notify_all();
        true
    }

    /// Blocks until the signal is set, then returns the reason.
    #[must_use]
    pub fn wait(&self) -> String {
        let mut slot = self.reason.lock();
        loop {
            if let Some(reason) = slot.as_ref() {
                return reason.clone();
            }
            self.signaled.wait(&mut slot);
        }
    }

    /// Like [`wait`](Self::wait), bounded by a timeout.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.reason.lock();
        while slot.is_none() {
            if self.signaled.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }
        slot.clone()
    }

    /// The reason, when already set.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }

    /// Whether the signal fired.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.reason.lock().is_some()
    }
}

impl Default for DisconnectSignal {
    fn default() -> Self {
        Self::new()
    }
}

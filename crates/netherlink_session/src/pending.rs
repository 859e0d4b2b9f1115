//! # Pending-Request Table
//!
//! Correlates fire-and-forget replies from the dispatch loop with callers
//! blocked on a synchronous wait.
//!
//! ## Lifecycle
//!
//! ```text
//! caller:        insert(token) ──> wait(timeout) ──> abandon(token)
//! dispatch loop:            fulfil(token, value)
//! ```
//!
//! A token stays in the table for the whole interval between issue and
//! either delivery or abandonment. A `fulfil` for a token that was never
//! registered, or was already abandoned, is silently dropped — the caller
//! may have timed out and walked away, and drop-on-miss is what keeps the
//! table from leaking entries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

enum SlotState<T> {
    Waiting,
    Delivered(T),
    Released,
}

struct Slot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

/// The caller-side handle of one pending request.
pub struct Awaiter<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Awaiter<T> {
    /// Blocks the calling thread until the result arrives, the slot is
    /// released, or the timeout expires. `None` timeout waits forever.
    ///
    /// Returns exactly once per registration.
    #[must_use]
    pub fn wait(&self, timeout: Option<Duration>) -> Option<T> {
        let mut state = self.slot.state.lock();
        match timeout {
            None => {
                while matches!(*state, SlotState::Waiting) {
                    self.slot.ready.wait(&mut state);
                }
            }
            Some(limit) => {
                let deadline = Instant::now() + limit;
                while matches!(*state, SlotState::Waiting) {
                    if self.slot.ready.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
            }
        }
        // A late fulfil after this point sees a non-waiting slot and drops.
        match std::mem::replace(&mut *state, SlotState::Released) {
            SlotState::Delivered(value) => Some(value),
            SlotState::Waiting | SlotState::Released => None,
        }
    }
}

/// Concurrency-safe map from correlation token to one-shot result slot.
pub struct PendingTable<T> {
    slots: Mutex<HashMap<String, Arc<Slot<T>>>>,
}

impl<T> PendingTable<T> {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Registers an empty slot under the given token.
    #[must_use]
    pub fn insert(&self, token: &str) -> Awaiter<T> {
        let slot = Arc::new(Slot {
            state: Mutex::new(SlotState::Waiting),
            ready: Condvar::new(),
        });
        self.slots.lock().insert(token.to_string(), Arc::clone(&slot));
        Awaiter { slot }
    }

    /// Delivers a result; wakes the waiter when the token is still
    /// registered and unfilled, drops the value otherwise.
    ///
    /// At most one fulfil per token has observable effect.
    pub fn fulfil(&self, token: &str, value: T) -> bool {
        let slot = self.slots.lock().get(token).cloned();
        let Some(slot) = slot else {
            return false;
        };
        let mut state = slot.state.lock();
        if matches!(*state, SlotState::Waiting) {
            *state = SlotState::Delivered(value);
            slot.ready.notify_one();
            true
        } else {
            false
        }
    }

    /// Removes the entry for a token (after a completed or timed-out wait).
    pub fn abandon(&self, token: &str) {
        self.slots.lock().remove(token);
    }

    /// Wakes every current waiter empty-handed and leaves the entries for
    /// their owners to abandon.
    pub fn release_all(&self) {
        let slots: Vec<Arc<Slot<T>>> = self.slots.lock().values().cloned().collect();
        for slot in slots {
            let mut state = slot.state.lock();
            if matches!(*state, SlotState::Waiting) {
                *state = SlotState::Released;
                slot.ready.notify_all();
            }
        }
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// True when no entry is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

impl<T> Default for PendingTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fulfil_wakes_waiter() {
        let table = Arc::new(PendingTable::new());
        let awaiter = table.insert("cmd_1");

        let fulfiller = {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                assert!(table.fulfil("cmd_1", 42));
            })
        };

        assert_eq!(awaiter.wait(Some(Duration::from_secs(5))), Some(42));
        table.abandon("cmd_1");
        assert!(table.is_empty());
        fulfiller.join().unwrap();
    }

    #[test]
    fn test_timeout_returns_none() {
        let table: PendingTable<i32> = PendingTable::new();
        let awaiter = table.insert("cmd_1");
        assert_eq!(awaiter.wait(Some(Duration::from_millis(10))), None);
        table.abandon("cmd_1");
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_unknown_token_is_dropped() {
        let table: PendingTable<i32> = PendingTable::new();
        assert!(!table.fulfil("never_registered", 1));
    }

    #[test]
    fn test_late_fulfil_after_timeout_is_dropped() {
        let table: PendingTable<i32> = PendingTable::new();
        let awaiter = table.insert("cmd_1");
        assert_eq!(awaiter.wait(Some(Duration::from_millis(5))), None);
        // entry still registered until abandon, but the slot already closed
        assert!(!table.fulfil("cmd_1", 42));
        table.abandon("cmd_1");
    }

    #[test]
    fn test_second_fulfil_has_no_effect() {
        let table: PendingTable<i32> = PendingTable::new();
        let awaiter = table.insert("cmd_1");
        assert!(table.fulfil("cmd_1", 1));
        assert!(!table.fulfil("cmd_1", 2));
        assert_eq!(awaiter.wait(Some(Duration::from_secs(1))), Some(1));
    }

    #[test]
    fn test_release_all_wakes_empty_handed() {
        let table: Arc<PendingTable<i32>> = Arc::new(PendingTable::new());
        let awaiter = table.insert("cmd_1");

        let releaser = {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                table.release_all();
            })
        };

        assert_eq!(awaiter.wait(Some(Duration::from_secs(5))), None);
        releaser.join().unwrap();
    }
}

//! Correlation token generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Produces unique, human-readable tokens scoped by purpose.
///
/// Tokens render as `"<prefix>_<n>"` with a monotonically increasing
/// per-counter sequence; no two calls on the same counter ever return the
/// same token within a process lifetime.
pub struct TokenCounter {
    prefix: &'static str,
    next_id: AtomicU64,
}

impl TokenCounter {
    /// A counter for the given purpose prefix.
    #[must_use]
    pub const fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next_id: AtomicU64::new(0),
        }
    }

    /// The next token.
    #[must_use]
    pub fn next(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}_{n}", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_tokens_are_sequential() {
        let counter = TokenCounter::new("cmd");
        assert_eq!(counter.next(), "cmd_1");
        assert_eq!(counter.next(), "cmd_2");
        assert_eq!(counter.next(), "cmd_3");
    }

    #[test]
    fn test_tokens_unique_across_threads() {
        let counter = Arc::new(TokenCounter::new("task"));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || (0..250).map(|_| counter.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for token in handle.join().unwrap() {
                assert!(seen.insert(token), "duplicate token");
            }
        }
        assert_eq!(seen.len(), 1000);
    }
}

use std::{hash::Hash, time::Duration};

use dashmap::DashMap;

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);

/// Per-key exponential retry delay.
#[derive(Debug)]
pub struct Backoff<K: Eq + Hash> {
    initial: Duration,
    max: Duration,
    attempts: DashMap<K, u32>,
}

impl<K: Eq + Hash> Default for Backoff<K> {
    fn default() -> Self {
        Self::new(INITIAL_DELAY, MAX_DELAY)
    }
}

impl<K: Eq + Hash> Backoff<K> {
    /// Delays start at `initial` and never exceed `max`.
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            attempts: DashMap::new(),
        }
    }

    /// Delay before the next retry of `key`, doubling with every failure.
    pub fn next_delay(&self, key: K) -> Duration {
        let mut attempts = self.attempts.entry(key).or_insert(0);
        let exponent = *attempts;
        *attempts = attempts.saturating_add(1);
        self.initial
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max)
    }

    /// Reset `key` after a successful run.
    pub fn forget(&self, key: &K) {
        self.attempts.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_up_to_the_cap() {
        let backoff = Backoff::default();
        let delays: Vec<_> = (0..6).map(|_| backoff.next_delay("a")).collect();
        assert_eq!(
            delays,
            [1, 2, 4, 8, 10, 10].map(Duration::from_secs).to_vec()
        );
    }

    #[test]
    fn keys_are_independent_and_reset() {
        let backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(1));
        backoff.next_delay("a");
        backoff.next_delay("a");
        assert_eq!(backoff.next_delay("b"), Duration::from_millis(100));

        backoff.forget(&"a");
        assert_eq!(backoff.next_delay("a"), Duration::from_millis(100));
    }

    #[test]
    fn huge_attempt_counts_saturate() {
        let backoff = Backoff::default();
        for _ in 0..100 {
            backoff.next_delay("a");
        }
        assert_eq!(backoff.next_delay("a"), MAX_DELAY);
    }
}

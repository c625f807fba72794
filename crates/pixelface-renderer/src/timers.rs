use std::collections::BTreeMap;
use std::time::Duration;

/// Cancellable one-shot timers, at most one per key.
///
/// Deadlines are offsets on the owner's clock. Nothing fires by itself: the
/// owner drains due entries with [`TimerArena::pop_due`], so clearing the arena
/// is enough to guarantee no stale callback ever runs.
#[derive(Debug)]
pub struct TimerArena<K> {
    pending: BTreeMap<K, Duration>,
}

impl<K: Ord + Copy> TimerArena<K> {
    pub fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
        }
    }

    /// Arms `key` to fire at `at`, replacing any earlier deadline for it.
    pub fn schedule(&mut self, key: K, at: Duration) {
        self.pending.insert(key, at);
    }

    pub fn cancel(&mut self, key: K) -> bool {
        self.pending.remove(&key).is_some()
    }

    /// Cancels everything; returns how many timers were pending.
    pub fn clear(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn deadline(&self, key: K) -> Option<Duration> {
        self.pending.get(&key).copied()
    }

    /// Earliest deadline of any pending timer.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.values().min().copied()
    }

    /// Removes and returns the earliest timer due at or before `now`. Ties go to
    /// the smaller key.
    pub fn pop_due(&mut self, now: Duration) -> Option<(K, Duration)> {
        let (key, at) = self
            .pending
            .iter()
            .filter(|(_, at)| **at <= now)
            .min_by_key(|(_, at)| **at)
            .map(|(key, at)| (*key, *at))?;
        self.pending.remove(&key);
        Some((key, at))
    }
}

impl<K: Ord + Copy> Default for TimerArena<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn pops_in_deadline_order() {
        let mut timers = TimerArena::new();
        timers.schedule("squeeze", ms(300));
        timers.schedule("blink", ms(100));
        timers.schedule("smile", ms(200));

        assert_eq!(timers.pop_due(ms(50)), None);
        assert_eq!(timers.pop_due(ms(250)), Some(("blink", ms(100))));
        assert_eq!(timers.pop_due(ms(250)), Some(("smile", ms(200))));
        assert_eq!(timers.pop_due(ms(250)), None);
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn rescheduling_replaces_the_deadline() {
        let mut timers = TimerArena::new();
        timers.schedule(1, ms(100));
        timers.schedule(1, ms(900));
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.deadline(1), Some(ms(900)));
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut timers = TimerArena::new();
        timers.schedule(1, ms(10));
        assert!(timers.cancel(1));
        assert!(!timers.cancel(1));
        assert_eq!(timers.clear(), 0);
        assert!(timers.is_empty());
    }
}

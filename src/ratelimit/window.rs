//! Per-identifier attempt log.

use std::collections::VecDeque;

/// Ordered log of accepted attempt timestamps for one identifier.
///
/// Timestamps are milliseconds since the Unix epoch, appended in the order
/// they were accepted.
#[derive(Debug, Clone, Default)]
pub struct AttemptLog {
    stamps: VecDeque<i64>,
}

impl AttemptLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every timestamp that is no longer inside the window ending at `now`.
    ///
    /// A timestamp `t` survives while `now - t < window_ms`.
    pub fn prune(&mut self, now: i64, window_ms: i64) {
        self.stamps.retain(|&t| now - t < window_ms);
    }

    /// Count of timestamps inside the window, without mutating the log.
    pub fn live_count(&self, now: i64, window_ms: i64) -> usize {
        self.stamps.iter().filter(|&&t| now - t < window_ms).count()
    }

    /// Oldest timestamp still held.
    pub fn oldest(&self) -> Option<i64> {
        self.stamps.front().copied()
    }

    /// Append an accepted attempt.
    pub fn record(&mut self, now: i64) {
        self.stamps.push_back(now);
    }

    /// Number of timestamps held (pruned or not).
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    /// Whether the log holds no timestamps.
    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_keeps_strictly_inside_window() {
        let mut log = AttemptLog::new();
        log.record(0);
        log.record(500);
        log.record(999);

        // At t=1000 with a 1000ms window, t=0 is exactly one window old.
        log.prune(1_000, 1_000);

        assert_eq!(log.len(), 2);
        assert_eq!(log.oldest(), Some(500));
    }

    #[test]
    fn test_live_count_does_not_mutate() {
        let mut log = AttemptLog::new();
        log.record(0);
        log.record(10);

        assert_eq!(log.live_count(5_000, 1_000), 0);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_empty_log() {
        let mut log = AttemptLog::new();
        log.prune(100, 10);

        assert!(log.is_empty());
        assert_eq!(log.oldest(), None);
    }
}

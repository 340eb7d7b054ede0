//! Core sliding-window rate limiter.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

use super::clock::{Clock, SystemClock};
use super::policy::LimitPolicy;
use super::window::AttemptLog;
use crate::error::{Result, TollgateError};

/// Identifier used when the caller has no natural key.
pub const DEFAULT_IDENTIFIER: &str = "default";

/// Outcome of a single attempt check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    /// Whether the attempt was accepted and recorded
    pub allowed: bool,
    /// Whole seconds until a slot frees up, present only when throttled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl RateLimitDecision {
    fn allowed() -> Self {
        Self {
            allowed: true,
            retry_after_secs: None,
        }
    }

    fn throttled(retry_after_secs: u64) -> Self {
        Self {
            allowed: false,
            retry_after_secs: Some(retry_after_secs),
        }
    }
}

/// A sliding-window log rate limiter.
///
/// Every accepted attempt is stored with its timestamp and pruned on read,
/// so the count inside any window is exact. Identifiers are independent;
/// each identifier's read-modify-write runs under its map shard lock, so
/// concurrent callers on the same identifier cannot overrun the limit.
///
/// Identifiers are never evicted implicitly. Call [`RateLimiter::sweep_idle`]
/// to drop identifiers with no attempts left in the window.
pub struct RateLimiter {
    /// Attempt logs indexed by identifier
    attempts: DashMap<String, AttemptLog>,
    /// Maximum accepted attempts per window
    max_requests: u32,
    /// Window length in milliseconds
    window_ms: i64,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter reading the system clock.
    pub fn new(max_requests: u32, window: Duration) -> Result<Self> {
        Self::with_clock(max_requests, window, Arc::new(SystemClock))
    }

    /// Create a limiter reading the given clock.
    pub fn with_clock(max_requests: u32, window: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        if max_requests == 0 {
            return Err(TollgateError::Config(
                "rate limiter max_requests must be positive".to_string(),
            ));
        }
        let window_ms = i64::try_from(window.as_millis()).map_err(|_| {
            TollgateError::Config("rate limiter window is too large".to_string())
        })?;
        if window_ms <= 0 {
            return Err(TollgateError::Config(
                "rate limiter window must be at least one millisecond".to_string(),
            ));
        }

        Ok(Self {
            attempts: DashMap::new(),
            max_requests,
            window_ms,
            clock,
        })
    }

    /// Create a limiter from a configured policy.
    pub fn from_policy(policy: &LimitPolicy) -> Result<Self> {
        Self::new(policy.max_requests, policy.window())
    }

    /// Create a limiter from a configured policy with the given clock.
    pub fn from_policy_with_clock(policy: &LimitPolicy, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_clock(policy.max_requests, policy.window(), clock)
    }

    /// Check an attempt for `identifier`, recording it if accepted.
    ///
    /// Rejected attempts are not recorded.
    pub fn is_allowed(&self, identifier: &str) -> RateLimitDecision {
        let now = self.clock.now_millis();
        let mut log = self.attempts.entry(identifier.to_string()).or_default();

        log.prune(now, self.window_ms);

        trace!(
            identifier = %identifier,
            in_window = log.len(),
            limit = self.max_requests,
            "Checking rate limit"
        );

        if log.len() >= self.max_requests as usize {
            let oldest = log.oldest().unwrap_or(now);
            let retry_after_secs = self.retry_after_secs(oldest, now);
            debug!(
                identifier = %identifier,
                retry_after_secs,
                "Rate limit exceeded"
            );
            return RateLimitDecision::throttled(retry_after_secs);
        }

        log.record(now);
        RateLimitDecision::allowed()
    }

    /// Check an attempt against the shared default identifier.
    pub fn check(&self) -> RateLimitDecision {
        self.is_allowed(DEFAULT_IDENTIFIER)
    }

    /// Attempts `identifier` may still make in the current window.
    ///
    /// This does not record anything and leaves the stored log untouched.
    pub fn remaining_requests(&self, identifier: &str) -> u32 {
        let now = self.clock.now_millis();
        let used = self
            .attempts
            .get(identifier)
            .map(|log| log.live_count(now, self.window_ms))
            .unwrap_or(0);

        (self.max_requests as usize).saturating_sub(used) as u32
    }

    /// Remaining attempts for the shared default identifier.
    pub fn remaining(&self) -> u32 {
        self.remaining_requests(DEFAULT_IDENTIFIER)
    }

    /// Drop identifiers whose logs are empty once pruned.
    ///
    /// Returns the number of identifiers removed.
    pub fn sweep_idle(&self) -> usize {
        let now = self.clock.now_millis();
        let before = self.attempts.len();

        self.attempts.retain(|_, log| {
            log.prune(now, self.window_ms);
            !log.is_empty()
        });

        let removed = before.saturating_sub(self.attempts.len());
        if removed > 0 {
            info!(removed, remaining = self.attempts.len(), "Swept idle identifiers");
        }
        removed
    }

    /// Number of identifiers currently tracked.
    pub fn identifier_count(&self) -> usize {
        self.attempts.len()
    }

    /// Forget every identifier.
    pub fn clear(&self) {
        self.attempts.clear();
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms as u64)
    }

    /// Seconds until `oldest` leaves the window, rounded up.
    ///
    /// Clamped to `1..=ceil(window / 1s)` so a clock stepping backwards
    /// cannot report a wait longer than one window.
    fn retry_after_secs(&self, oldest: i64, now: i64) -> u64 {
        let wait_ms = (oldest + self.window_ms - now).max(1) as u64;
        let max_secs = (self.window_ms as u64).div_ceil(1000);
        wait_ms.div_ceil(1000).clamp(1, max_secs)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_requests", &self.max_requests)
            .field("window_ms", &self.window_ms)
            .field("identifiers", &self.attempts.len())
            .finish()
    }
}

//! The application's set of limiters.

use std::sync::Arc;
use tracing::info;

use super::clock::{Clock, SystemClock};
use super::limiter::RateLimiter;
use super::policy::PolicyKind;
use crate::config::RateLimitingConfig;
use crate::error::Result;

/// One limiter per policy, constructed once and shared by handle.
#[derive(Debug, Clone)]
pub struct Limiters {
    upload: Arc<RateLimiter>,
    auth: Arc<RateLimiter>,
}

impl Limiters {
    /// Build both limiters from configuration using the system clock.
    pub fn from_config(config: &RateLimitingConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build both limiters from configuration sharing one clock.
    pub fn with_clock(config: &RateLimitingConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.upload.validate("rate_limiting.upload")?;
        config.auth.validate("rate_limiting.auth")?;

        let upload = RateLimiter::from_policy_with_clock(&config.upload, clock.clone())?;
        let auth = RateLimiter::from_policy_with_clock(&config.auth, clock)?;

        info!(
            upload_max = config.upload.max_requests,
            upload_window_ms = config.upload.window_ms,
            auth_max = config.auth.max_requests,
            auth_window_ms = config.auth.window_ms,
            "Rate limiters initialized"
        );

        Ok(Self {
            upload: Arc::new(upload),
            auth: Arc::new(auth),
        })
    }

    /// The limiter for `kind`.
    pub fn get(&self, kind: PolicyKind) -> &Arc<RateLimiter> {
        match kind {
            PolicyKind::Upload => &self.upload,
            PolicyKind::Auth => &self.auth,
        }
    }

    pub fn upload(&self) -> &Arc<RateLimiter> {
        &self.upload
    }

    pub fn auth(&self) -> &Arc<RateLimiter> {
        &self.auth
    }

    /// Sweep idle identifiers from every limiter.
    pub fn sweep_idle(&self) -> usize {
        self.upload.sweep_idle() + self.auth.sweep_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{LimitPolicy, ManualClock};

    #[test]
    fn test_limiters_are_independent() {
        let clock = ManualClock::new(0);
        let limiters =
            Limiters::with_clock(&RateLimitingConfig::default(), Arc::new(clock)).unwrap();

        for _ in 0..3 {
            assert!(limiters.get(PolicyKind::Upload).is_allowed("a@b.io").allowed);
        }
        assert!(!limiters.upload().is_allowed("a@b.io").allowed);

        assert_eq!(limiters.auth().remaining_requests("a@b.io"), 5);
        assert!(limiters.get(PolicyKind::Auth).is_allowed("a@b.io").allowed);
    }

    #[test]
    fn test_auth_window_is_fifteen_minutes() {
        let clock = ManualClock::new(0);
        let limiters =
            Limiters::with_clock(&RateLimitingConfig::default(), Arc::new(clock.clone())).unwrap();

        for _ in 0..5 {
            assert!(limiters.auth().is_allowed("user@example.com").allowed);
        }
        let denied = limiters.auth().is_allowed("user@example.com");
        assert_eq!(denied.retry_after_secs, Some(900));

        clock.set(15 * 60 * 1000);
        assert!(limiters.auth().is_allowed("user@example.com").allowed);
    }

    #[test]
    fn test_invalid_policy_fails_fast() {
        let config = RateLimitingConfig {
            upload: LimitPolicy::new(0, 60_000),
            ..Default::default()
        };
        assert!(Limiters::from_config(&config).is_err());
    }

    #[test]
    fn test_sweep_covers_both_limiters() {
        let clock = ManualClock::new(0);
        let limiters =
            Limiters::with_clock(&RateLimitingConfig::default(), Arc::new(clock.clone())).unwrap();

        limiters.upload().is_allowed("x");
        limiters.auth().is_allowed("y");

        clock.set(60_000);
        assert_eq!(limiters.sweep_idle(), 1);

        clock.set(15 * 60 * 1000);
        assert_eq!(limiters.sweep_idle(), 1);
    }
}

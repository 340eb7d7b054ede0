//! Named limiting policies.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{Result, TollgateError};

/// Default attempts per window for a general-purpose limiter.
const DEFAULT_MAX_REQUESTS: u32 = 5;
/// Default window for a general-purpose limiter.
const DEFAULT_WINDOW_MS: u64 = 60_000;

/// Which of the application's limiters a request is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// File uploads
    Upload,
    /// Sign-in and sign-up attempts, keyed by email
    Auth,
}

impl PolicyKind {
    /// User-facing text for a throttled attempt.
    pub fn throttle_message(&self, retry_after_secs: u64) -> String {
        match self {
            PolicyKind::Upload => format!(
                "Rate limit exceeded. Please wait {retry_after_secs} seconds before uploading again."
            ),
            PolicyKind::Auth => {
                format!("Too many attempts. Please try again in {retry_after_secs} seconds.")
            }
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::Upload => write!(f, "upload"),
            PolicyKind::Auth => write!(f, "auth"),
        }
    }
}

/// Attempts allowed per sliding window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitPolicy {
    /// Maximum accepted attempts inside one window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

fn default_max_requests() -> u32 {
    DEFAULT_MAX_REQUESTS
}

fn default_window_ms() -> u64 {
    DEFAULT_WINDOW_MS
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_ms: DEFAULT_WINDOW_MS,
        }
    }
}

/// A policy section where every field is optional.
#[derive(Debug, Default, Deserialize)]
struct PolicyOverrides {
    #[serde(default)]
    max_requests: Option<u32>,
    #[serde(default)]
    window_ms: Option<u64>,
}

impl PolicyOverrides {
    fn apply(self, preset: LimitPolicy) -> LimitPolicy {
        LimitPolicy {
            max_requests: self.max_requests.unwrap_or(preset.max_requests),
            window_ms: self.window_ms.unwrap_or(preset.window_ms),
        }
    }
}

impl LimitPolicy {
    pub fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
        }
    }

    /// Three uploads per minute.
    pub fn upload() -> Self {
        Self::new(3, 60_000)
    }

    /// Five authentication attempts per fifteen minutes.
    pub fn auth() -> Self {
        Self::new(5, 15 * 60 * 1000)
    }

    /// Deserialize a partial section on top of [`LimitPolicy::upload`].
    pub fn deserialize_upload<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        Ok(PolicyOverrides::deserialize(deserializer)?.apply(Self::upload()))
    }

    /// Deserialize a partial section on top of [`LimitPolicy::auth`].
    pub fn deserialize_auth<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        Ok(PolicyOverrides::deserialize(deserializer)?.apply(Self::auth()))
    }

    /// Window as a `Duration`.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Reject policies that could never admit an attempt.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.max_requests == 0 {
            return Err(TollgateError::Config(format!(
                "{name}: max_requests must be positive"
            )));
        }
        if self.window_ms == 0 {
            return Err(TollgateError::Config(format!(
                "{name}: window_ms must be positive"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(LimitPolicy::upload(), LimitPolicy::new(3, 60_000));
        assert_eq!(LimitPolicy::auth(), LimitPolicy::new(5, 900_000));
        assert_eq!(LimitPolicy::default(), LimitPolicy::new(5, 60_000));
    }

    #[test]
    fn test_validate_rejects_zero() {
        assert!(LimitPolicy::new(0, 1_000).validate("upload").is_err());
        assert!(LimitPolicy::new(1, 0).validate("upload").is_err());
        assert!(LimitPolicy::new(1, 1).validate("upload").is_ok());
    }

    #[test]
    fn test_parse_partial_policy() {
        let policy: LimitPolicy = serde_yaml::from_str("max_requests: 10").unwrap();
        assert_eq!(policy.max_requests, 10);
        assert_eq!(policy.window_ms, 60_000);
    }

    #[test]
    fn test_partial_sections_keep_their_preset() {
        let yaml = serde_yaml::Deserializer::from_str("max_requests: 10");
        let auth = LimitPolicy::deserialize_auth(yaml).unwrap();
        assert_eq!(auth, LimitPolicy::new(10, 900_000));

        let yaml = serde_yaml::Deserializer::from_str("window_ms: 120000");
        let upload = LimitPolicy::deserialize_upload(yaml).unwrap();
        assert_eq!(upload, LimitPolicy::new(3, 120_000));
    }

    #[test]
    fn test_throttle_message_per_policy() {
        assert_eq!(
            PolicyKind::Upload.throttle_message(12),
            "Rate limit exceeded. Please wait 12 seconds before uploading again."
        );
        assert_eq!(
            PolicyKind::Auth.throttle_message(42),
            "Too many attempts. Please try again in 42 seconds."
        );
    }

    #[test]
    fn test_policy_kind_serde() {
        let kind: PolicyKind = serde_json::from_str("\"auth\"").unwrap();
        assert_eq!(kind, PolicyKind::Auth);
        assert_eq!(PolicyKind::Upload.to_string(), "upload");
    }
}

//! Request and response types for the gate line protocol.
//!
//! Each request is one JSON object per line:
//!
//! ```text
//! {"op":"check","policy":"auth","identifier":"user@example.com"}
//! {"op":"remaining","policy":"upload"}
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::ratelimit::{Limiters, PolicyKind, DEFAULT_IDENTIFIER};

/// A request read from the gate input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GateRequest {
    /// Record an attempt if the policy allows it
    Check {
        policy: PolicyKind,
        #[serde(default)]
        identifier: Option<String>,
    },
    /// Report remaining attempts without recording one
    Remaining {
        policy: PolicyKind,
        #[serde(default)]
        identifier: Option<String>,
    },
}

/// A response line written to the gate output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GateResponse {
    Decision {
        policy: PolicyKind,
        identifier: String,
        allowed: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_after_secs: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Remaining {
        policy: PolicyKind,
        identifier: String,
        remaining: u32,
    },
    Error {
        error: String,
    },
}

impl GateRequest {
    /// Parse one input line.
    pub fn parse(line: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    /// Apply the request to the matching limiter.
    #[instrument(skip(self, limiters), fields(request = ?self))]
    pub fn handle(self, limiters: &Limiters) -> GateResponse {
        match self {
            GateRequest::Check { policy, identifier } => {
                let identifier = identifier.unwrap_or_else(|| DEFAULT_IDENTIFIER.to_string());
                let decision = limiters.get(policy).is_allowed(&identifier);
                debug!(allowed = decision.allowed, "Handled check");

                GateResponse::Decision {
                    policy,
                    identifier,
                    allowed: decision.allowed,
                    retry_after_secs: decision.retry_after_secs,
                    message: decision
                        .retry_after_secs
                        .map(|secs| policy.throttle_message(secs)),
                }
            }
            GateRequest::Remaining { policy, identifier } => {
                let identifier = identifier.unwrap_or_else(|| DEFAULT_IDENTIFIER.to_string());
                let remaining = limiters.get(policy).remaining_requests(&identifier);

                GateResponse::Remaining {
                    policy,
                    identifier,
                    remaining,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitingConfig;
    use crate::ratelimit::ManualClock;
    use std::sync::Arc;

    fn limiters() -> Limiters {
        Limiters::with_clock(&RateLimitingConfig::default(), Arc::new(ManualClock::new(0))).unwrap()
    }

    #[test]
    fn test_parse_requests() {
        assert_eq!(
            GateRequest::parse(r#"{"op":"check","policy":"auth","identifier":"a@b.c"}"#).unwrap(),
            GateRequest::Check {
                policy: PolicyKind::Auth,
                identifier: Some("a@b.c".to_string())
            }
        );
        assert_eq!(
            GateRequest::parse(r#"{"op":"remaining","policy":"upload"}"#).unwrap(),
            GateRequest::Remaining {
                policy: PolicyKind::Upload,
                identifier: None
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(GateRequest::parse(r#"{"op":"reset","policy":"auth"}"#).is_err());
        assert!(GateRequest::parse(r#"{"op":"check","policy":"download"}"#).is_err());
        assert!(GateRequest::parse("not json").is_err());
    }

    #[test]
    fn test_check_uses_default_identifier() {
        let limiters = limiters();
        let response = GateRequest::Check {
            policy: PolicyKind::Upload,
            identifier: None,
        }
        .handle(&limiters);

        assert_eq!(
            response,
            GateResponse::Decision {
                policy: PolicyKind::Upload,
                identifier: "default".to_string(),
                allowed: true,
                retry_after_secs: None,
                message: None,
            }
        );
        assert_eq!(limiters.upload().remaining(), 2);
    }

    #[test]
    fn test_throttled_response_json() {
        let limiters = limiters();
        let request = GateRequest::Check {
            policy: PolicyKind::Upload,
            identifier: Some("u1".to_string()),
        };
        for _ in 0..3 {
            request.clone().handle(&limiters);
        }

        let json = serde_json::to_value(request.handle(&limiters)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "policy": "upload",
                "identifier": "u1",
                "allowed": false,
                "retry_after_secs": 60,
                "message": "Rate limit exceeded. Please wait 60 seconds before uploading again."
            })
        );
    }

    #[test]
    fn test_throttled_auth_message() {
        let limiters = limiters();
        let request = GateRequest::Check {
            policy: PolicyKind::Auth,
            identifier: Some("a@b.c".to_string()),
        };
        for _ in 0..5 {
            request.clone().handle(&limiters);
        }

        match request.handle(&limiters) {
            GateResponse::Decision {
                allowed, message, ..
            } => {
                assert!(!allowed);
                assert_eq!(
                    message.as_deref(),
                    Some("Too many attempts. Please try again in 900 seconds.")
                );
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_remaining_response_json() {
        let response = GateRequest::Remaining {
            policy: PolicyKind::Auth,
            identifier: Some("x".to_string()),
        }
        .handle(&limiters());

        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"policy":"auth","identifier":"x","remaining":5}"#
        );
    }
}

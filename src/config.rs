//! Configuration management for Tollgate.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{Result, TollgateError};
use crate::ratelimit::LimitPolicy;
use crate::validation::FilePolicy;

/// Prefix for environment variable overrides, e.g.
/// `TOLLGATE__RATE_LIMITING__AUTH__MAX_REQUESTS=10`.
const ENV_PREFIX: &str = "TOLLGATE";

/// Main configuration for Tollgate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TollgateConfig {
    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Upload validation rules
    #[serde(default)]
    pub uploads: FilePolicy,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Policy for file uploads
    #[serde(
        default = "LimitPolicy::upload",
        deserialize_with = "LimitPolicy::deserialize_upload"
    )]
    pub upload: LimitPolicy,

    /// Policy for authentication attempts
    #[serde(
        default = "LimitPolicy::auth",
        deserialize_with = "LimitPolicy::deserialize_auth"
    )]
    pub auth: LimitPolicy,

    /// Interval between idle-identifier sweeps; sweeping is off when unset
    #[serde(default)]
    pub sweep_interval_secs: Option<u64>,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            upload: LimitPolicy::upload(),
            auth: LimitPolicy::auth(),
            sweep_interval_secs: None,
        }
    }
}

impl TollgateConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: TollgateConfig = serde_yaml::from_str(yaml)
            .map_err(|e| TollgateError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an optional YAML file, then apply
    /// `TOLLGATE__*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }

        let config: TollgateConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| TollgateError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> Result<()> {
        self.rate_limiting.upload.validate("rate_limiting.upload")?;
        self.rate_limiting.auth.validate("rate_limiting.auth")?;

        if self.rate_limiting.sweep_interval_secs == Some(0) {
            return Err(TollgateError::Config(
                "rate_limiting.sweep_interval_secs must be positive".to_string(),
            ));
        }
        if self.uploads.max_size_bytes == 0 {
            return Err(TollgateError::Config(
                "uploads.max_size_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

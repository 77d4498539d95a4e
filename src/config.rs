//! Configuration management for Tollgate.
//!
//! Configuration is layered: built-in defaults, then an optional file, then
//! `TOLLGATE__`-prefixed environment variables, e.g.
//! `TOLLGATE__TIERS__FREE__PER_MINUTE=10`. Every loaded configuration is
//! validated before it is returned, so a bad tier table fails at startup
//! rather than inside a rate limit check.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TollgateError};
use crate::ratelimit::limiter::DEFAULT_IDLE_THRESHOLD_SECS;
use crate::ratelimit::TierTable;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TOLLGATE";

/// Main configuration for Tollgate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TollgateConfig {
    /// Limiter and janitor settings
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// Per-tier request budgets
    #[serde(default)]
    pub tiers: TierTable,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Limiter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Seconds between janitor sweeps
    #[serde(default = "default_janitor_interval")]
    pub janitor_interval_secs: u64,

    /// Seconds past a record's day window before it counts as idle
    #[serde(default = "default_idle_threshold")]
    pub idle_threshold_secs: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            janitor_interval_secs: default_janitor_interval(),
            idle_threshold_secs: default_idle_threshold(),
        }
    }
}

/// Upper bound on the idle threshold (ten years).
const MAX_IDLE_THRESHOLD_SECS: u64 = 10 * 365 * 86_400;

fn default_janitor_interval() -> u64 {
    3600
}

fn default_idle_threshold() -> u64 {
    DEFAULT_IDLE_THRESHOLD_SECS
}

impl LimiterConfig {
    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_secs)
    }

    pub fn idle_threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.idle_threshold_secs.min(MAX_IDLE_THRESHOLD_SECS) as i64)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl TollgateConfig {
    /// Load configuration from an optional file plus the environment.
    ///
    /// The file format is inferred from its extension. Sources are merged key
    /// by key over the built-in defaults, so a file or environment variable
    /// may set a single field such as one tier's `per_minute`.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let defaults = config::Config::try_from(&TollgateConfig::default())?;
        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            info!(path = %path, "Loading configuration file");
            builder = builder.add_source(config::File::with_name(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: TollgateConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string.
    ///
    /// Unlike [`TollgateConfig::load`], a tier given here must list all of
    /// its limits; only whole sections fall back to defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: TollgateConfig = serde_yaml::from_str(yaml)
            .map_err(|e| TollgateError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every budget and interval is usable.
    pub fn validate(&self) -> Result<()> {
        if self.limiter.janitor_interval_secs == 0 {
            return Err(TollgateError::Config(
                "limiter.janitor_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.limiter.idle_threshold_secs > MAX_IDLE_THRESHOLD_SECS {
            return Err(TollgateError::Config(format!(
                "limiter.idle_threshold_secs must not exceed {}",
                MAX_IDLE_THRESHOLD_SECS
            )));
        }
        self.tiers.validate()
    }
}

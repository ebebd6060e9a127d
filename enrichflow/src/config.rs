//! Configuration for the enrichment pipeline.

use crate::errors::EnrichError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding [`EnrichmentConfig::provider_timeout_ms`].
pub const ENV_PROVIDER_TIMEOUT_MS: &str = "ENRICHFLOW_PROVIDER_TIMEOUT_MS";
/// Environment variable overriding [`EnrichmentConfig::cancel_between_providers`].
pub const ENV_CANCEL_BETWEEN_PROVIDERS: &str = "ENRICHFLOW_CANCEL_BETWEEN_PROVIDERS";
/// Environment variable overriding [`EnrichmentConfig::log_level`].
pub const ENV_LOG: &str = "ENRICHFLOW_LOG";

/// Output format for [`init_tracing`](crate::observability::init_tracing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Upper bound for one `get_context` call. `None` waits indefinitely.
    #[serde(default)]
    pub provider_timeout_ms: Option<u64>,
    /// Also poll the cancellation token before each provider call.
    #[serde(default)]
    pub cancel_between_providers: bool,
    /// Default log level for the crate.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: None,
            cancel_between_providers: false,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl EnrichmentConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-provider timeout.
    #[must_use]
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Enables or disables polling between provider calls.
    #[must_use]
    pub fn with_cancel_between_providers(mut self, enabled: bool) -> Self {
        self.cancel_between_providers = enabled;
        self
    }

    /// Sets the log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Sets the log format.
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// The per-provider timeout as a [`Duration`].
    #[must_use]
    pub fn provider_timeout(&self) -> Option<Duration> {
        self.provider_timeout_ms.map(Duration::from_millis)
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, EnrichError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EnrichError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Defaults overlaid with `ENRICHFLOW_*` environment variables.
    pub fn from_env() -> Result<Self, EnrichError> {
        Self::default().apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlays values from `lookup`, keyed by the `ENV_*` names.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, EnrichError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_PROVIDER_TIMEOUT_MS) {
            let ms = raw.trim().parse::<u64>().map_err(|e| {
                EnrichError::config(format!("{ENV_PROVIDER_TIMEOUT_MS}={raw}: {e}"))
            })?;
            self.provider_timeout_ms = Some(ms);
        }
        if let Some(raw) = lookup(ENV_CANCEL_BETWEEN_PROVIDERS) {
            self.cancel_between_providers = parse_bool(&raw).ok_or_else(|| {
                EnrichError::config(format!("{ENV_CANCEL_BETWEEN_PROVIDERS}={raw}: expected a boolean"))
            })?;
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.log_level = level;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), EnrichError> {
        if self.provider_timeout_ms == Some(0) {
            return Err(EnrichError::config("provider_timeout_ms must be greater than zero"));
        }
        if self.log_level.trim().is_empty() {
            return Err(EnrichError::config("log_level must not be empty"));
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

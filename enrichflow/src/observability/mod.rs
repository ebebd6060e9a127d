//! Tracing setup for applications embedding the pipeline.

use crate::config::{EnrichmentConfig, LogFormat};
use tracing_subscriber::{fmt, EnvFilter};

/// Builds the filter: `RUST_LOG` if set, otherwise `enrichflow=<log_level>`.
#[must_use]
pub fn env_filter(config: &EnrichmentConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("enrichflow={}", config.log_level)))
}

/// Installs a global `fmt` subscriber according to `config`.
///
/// Returns false if a global subscriber was already installed.
pub fn init_tracing(config: &EnrichmentConfig) -> bool {
    let filter = env_filter(config);
    let installed = match config.log_format {
        LogFormat::Text => fmt().with_env_filter(filter).with_target(false).try_init(),
        LogFormat::Json => fmt().json().with_env_filter(filter).try_init(),
    };
    installed.is_ok()
}

//! Error types for the enrichflow pipeline.
//!
//! Provider failures are always recovered by the worker and turned into
//! events. [`EnrichError`] covers the few failures that reach a caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for enrichflow operations.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// The background task for a run could not be started.
    #[error("Scheduling failure: {0}")]
    Scheduling(String),

    /// The configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A generic internal error, e.g. a worker task that failed to join.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EnrichError {
    /// Creates a scheduling error.
    #[must_use]
    pub fn scheduling(reason: impl Into<String>) -> Self {
        Self::Scheduling(reason.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }
}

/// Error raised by a single provider call for a single result.
///
/// Never aborts a run. The worker reports it through
/// [`EnrichmentSubscriber::on_error`](crate::events::EnrichmentSubscriber::on_error).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Provider '{provider}' failed: {message}")]
pub struct ProviderError {
    /// Display name of the failing provider.
    pub provider: String,
    /// Human-readable failure description.
    pub message: String,
}

impl ProviderError {
    /// Creates a new provider error.
    #[must_use]
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Wraps an [`anyhow::Error`], keeping the whole cause chain in the message.
    #[must_use]
    pub fn from_anyhow(provider: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::new(provider, format!("{err:#}"))
    }

    /// Creates the error reported when a provider call exceeds its time budget.
    #[must_use]
    pub fn timed_out(provider: impl Into<String>, timeout_ms: u64) -> Self {
        Self::new(provider, format!("timed out after {timeout_ms}ms"))
    }

    /// Creates the error reported when a provider call panics.
    #[must_use]
    pub fn panicked(provider: impl Into<String>, detail: &str) -> Self {
        Self::new(provider, format!("provider panicked: {detail}"))
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("ProviderError"));
        map.insert("provider".to_string(), serde_json::json!(self.provider));
        map.insert("message".to_string(), serde_json::json!(self.message));
        map
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

//! Owned pipeline events, as recorded or forwarded by subscribers.

use super::{RunId, SearchResult};
use std::collections::HashMap;

/// An event emitted by a run.
///
/// Every variant carries the id of the run that produced it.
#[derive(Debug, Clone)]
pub enum EnrichmentEvent {
    /// All enabled providers were consulted for the result at `index`.
    ResultEnriched {
        /// Originating run.
        run: RunId,
        /// Position of the result in the input batch.
        index: usize,
        /// The result with its contexts at the time of the event.
        result: SearchResult,
    },
    /// The run processed every result.
    EnrichmentComplete {
        /// Originating run.
        run: RunId,
    },
    /// One provider call failed for one result.
    ProviderError {
        /// Originating run.
        run: RunId,
        /// Display name of the failing provider.
        provider: String,
        /// Failure description.
        message: String,
    },
}

impl EnrichmentEvent {
    /// The originating run.
    #[must_use]
    pub fn run(&self) -> RunId {
        match self {
            Self::ResultEnriched { run, .. }
            | Self::EnrichmentComplete { run }
            | Self::ProviderError { run, .. } => *run,
        }
    }

    /// Dotted event type name, e.g. `"enrichment.result_enriched"`.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ResultEnriched { .. } => "enrichment.result_enriched",
            Self::EnrichmentComplete { .. } => "enrichment.complete",
            Self::ProviderError { .. } => "enrichment.provider_error",
        }
    }

    /// Returns the index for `ResultEnriched`, `None` otherwise.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::ResultEnriched { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Converts the event to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.event_type()));
        map.insert("run".to_string(), serde_json::json!(self.run().get()));

        match self {
            Self::ResultEnriched { index, result, .. } => {
                map.insert("index".to_string(), serde_json::json!(index));
                map.insert("search_id".to_string(), serde_json::json!(result.search_id()));
                map.insert(
                    "context_count".to_string(),
                    serde_json::json!(result.contexts().len()),
                );
            }
            Self::EnrichmentComplete { .. } => {}
            Self::ProviderError { provider, message, .. } => {
                map.insert("provider".to_string(), serde_json::json!(provider));
                map.insert("message".to_string(), serde_json::json!(message));
            }
        }

        map
    }
}

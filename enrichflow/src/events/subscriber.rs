//! Subscriber trait and implementations.

use crate::core::{EnrichmentEvent, RunId, SearchResult};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Level};

/// Receives incremental notifications from the current enrichment run.
///
/// Callbacks run on the worker's task, never on the caller of
/// `enrich_async`. They should return quickly; a UI that must process events
/// on its own thread can use [`ChannelSubscriber`].
pub trait EnrichmentSubscriber: Send + Sync {
    /// All enabled providers have been consulted for the result at `index`.
    fn on_result_enriched(&self, _run: RunId, _index: usize, _result: &SearchResult) {}

    /// The run processed every result.
    fn on_enrichment_complete(&self, _run: RunId) {}

    /// A provider call failed for one result.
    fn on_error(&self, _run: RunId, _provider: &str, _message: &str) {}
}

/// A subscriber that discards all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSubscriber;

impl EnrichmentSubscriber for NoOpSubscriber {}

/// A subscriber that logs notifications using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingSubscriber {
    level: Level,
}

impl Default for LoggingSubscriber {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingSubscriber {
    /// Creates a logging subscriber with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging subscriber.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Parses a level name ("debug", "info", ...), falling back to info.
    #[must_use]
    pub fn from_level_name(name: &str) -> Self {
        Self::new(name.parse().unwrap_or(Level::INFO))
    }
}

impl EnrichmentSubscriber for LoggingSubscriber {
    fn on_result_enriched(&self, run: RunId, index: usize, result: &SearchResult) {
        let contexts = result.contexts().len();
        if self.level == Level::DEBUG || self.level == Level::TRACE {
            debug!(%run, index, search_id = %result.search_id(), contexts, "Result enriched");
        } else {
            info!(%run, index, search_id = %result.search_id(), contexts, "Result enriched");
        }
    }

    fn on_enrichment_complete(&self, run: RunId) {
        info!(%run, "Enrichment complete");
    }

    fn on_error(&self, run: RunId, provider: &str, message: &str) {
        warn!(%run, provider, message, "Context provider error");
    }
}

/// A subscriber that records owned events, for tests and inspection.
#[derive(Debug, Default)]
pub struct CollectingSubscriber {
    events: RwLock<Vec<EnrichmentEvent>>,
}

impl CollectingSubscriber {
    /// Creates a new collecting subscriber.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events in delivery order.
    #[must_use]
    pub fn events(&self) -> Vec<EnrichmentEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Indices of `ResultEnriched` events, in delivery order.
    #[must_use]
    pub fn enriched_indices(&self) -> Vec<usize> {
        self.events.read().iter().filter_map(EnrichmentEvent::index).collect()
    }

    /// Results carried by `ResultEnriched` events, in delivery order.
    #[must_use]
    pub fn enriched_results(&self) -> Vec<SearchResult> {
        self.events
            .read()
            .iter()
            .filter_map(|e| match e {
                EnrichmentEvent::ResultEnriched { result, .. } => Some(result.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of `EnrichmentComplete` events.
    #[must_use]
    pub fn completions(&self) -> usize {
        self.events
            .read()
            .iter()
            .filter(|e| matches!(e, EnrichmentEvent::EnrichmentComplete { .. }))
            .count()
    }

    /// `(provider, message)` pairs of `ProviderError` events.
    #[must_use]
    pub fn errors(&self) -> Vec<(String, String)> {
        self.events
            .read()
            .iter()
            .filter_map(|e| match e {
                EnrichmentEvent::ProviderError { provider, message, .. } => {
                    Some((provider.clone(), message.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Distinct run ids seen, in first-seen order.
    #[must_use]
    pub fn runs(&self) -> Vec<RunId> {
        let mut runs = Vec::new();
        for event in self.events.read().iter() {
            if !runs.contains(&event.run()) {
                runs.push(event.run());
            }
        }
        runs
    }

    fn push(&self, event: EnrichmentEvent) {
        self.events.write().push(event);
    }
}

impl EnrichmentSubscriber for CollectingSubscriber {
    fn on_result_enriched(&self, run: RunId, index: usize, result: &SearchResult) {
        self.push(EnrichmentEvent::ResultEnriched {
            run,
            index,
            result: result.clone(),
        });
    }

    fn on_enrichment_complete(&self, run: RunId) {
        self.push(EnrichmentEvent::EnrichmentComplete { run });
    }

    fn on_error(&self, run: RunId, provider: &str, message: &str) {
        self.push(EnrichmentEvent::ProviderError {
            run,
            provider: provider.to_string(),
            message: message.to_string(),
        });
    }
}

/// A subscriber that forwards owned events over an unbounded channel.
///
/// Lets an interactive thread drain events at its own pace.
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<EnrichmentEvent>,
}

impl ChannelSubscriber {
    /// Creates the subscriber and the receiving end.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EnrichmentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: EnrichmentEvent) {
        if self.tx.send(event).is_err() {
            debug!("Event receiver dropped; discarding enrichment event");
        }
    }
}

impl EnrichmentSubscriber for ChannelSubscriber {
    fn on_result_enriched(&self, run: RunId, index: usize, result: &SearchResult) {
        self.send(EnrichmentEvent::ResultEnriched {
            run,
            index,
            result: result.clone(),
        });
    }

    fn on_enrichment_complete(&self, run: RunId) {
        self.send(EnrichmentEvent::EnrichmentComplete { run });
    }

    fn on_error(&self, run: RunId, provider: &str, message: &str) {
        self.send(EnrichmentEvent::ProviderError {
            run,
            provider: provider.to_string(),
            message: message.to_string(),
        });
    }
}

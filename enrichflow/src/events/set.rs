//! Explicit subscription management and fan-out.

use super::EnrichmentSubscriber;
use crate::core::{EnrichmentEvent, RunId, SearchResult};
use crate::errors::panic_message;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Handle returned by [`SubscriberSet::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A notification borrowed from the worker at emission time.
#[derive(Debug, Clone, Copy)]
pub enum Notification<'a> {
    /// See [`EnrichmentSubscriber::on_result_enriched`].
    ResultEnriched {
        /// Position in the input batch.
        index: usize,
        /// The enriched result.
        result: &'a SearchResult,
    },
    /// See [`EnrichmentSubscriber::on_enrichment_complete`].
    EnrichmentComplete,
    /// See [`EnrichmentSubscriber::on_error`].
    ProviderError {
        /// Failing provider.
        provider: &'a str,
        /// Failure description.
        message: &'a str,
    },
}

impl Notification<'_> {
    /// Converts into an owned event tagged with `run`.
    #[must_use]
    pub fn to_event(&self, run: RunId) -> EnrichmentEvent {
        match *self {
            Self::ResultEnriched { index, result } => EnrichmentEvent::ResultEnriched {
                run,
                index,
                result: result.clone(),
            },
            Self::EnrichmentComplete => EnrichmentEvent::EnrichmentComplete { run },
            Self::ProviderError { provider, message } => EnrichmentEvent::ProviderError {
                run,
                provider: provider.to_string(),
                message: message.to_string(),
            },
        }
    }

    fn deliver(&self, run: RunId, subscriber: &dyn EnrichmentSubscriber) {
        match *self {
            Self::ResultEnriched { index, result } => {
                subscriber.on_result_enriched(run, index, result);
            }
            Self::EnrichmentComplete => subscriber.on_enrichment_complete(run),
            Self::ProviderError { provider, message } => {
                subscriber.on_error(run, provider, message);
            }
        }
    }
}

/// The set of subscribers attached to a coordinator.
///
/// Subscribers stay attached until explicitly removed with
/// [`unsubscribe`](Self::unsubscribe).
#[derive(Default)]
pub struct SubscriberSet {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(SubscriptionId, Arc<dyn EnrichmentSubscriber>)>>,
}

impl SubscriberSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber.
    pub fn subscribe(&self, subscriber: Arc<dyn EnrichmentSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.subscribers.write().push((id, subscriber));
        id
    }

    /// Removes a subscriber. Returns false if the id is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Returns the number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns true if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Delivers a notification to every subscriber, in subscription order.
    ///
    /// A panicking subscriber is logged and skipped.
    pub fn notify(&self, run: RunId, notification: &Notification<'_>) {
        self.notify_while(run, notification, || true);
    }

    /// Like [`notify`](Self::notify), but asks `live` before each subscriber
    /// and stops at the first `false`.
    ///
    /// Returns the number of subscribers called.
    pub fn notify_while(
        &self,
        run: RunId,
        notification: &Notification<'_>,
        live: impl Fn() -> bool,
    ) -> usize {
        // Release the lock before calling out so callbacks may (un)subscribe.
        let subscribers: Vec<_> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, s)| s.clone())
            .collect();

        let mut called = 0;
        for subscriber in subscribers {
            if !live() {
                break;
            }
            called += 1;
            if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                notification.deliver(run, subscriber.as_ref());
            })) {
                warn!(
                    %run,
                    panic = %panic_message(payload.as_ref()),
                    "Enrichment subscriber panicked"
                );
            }
        }
        called
    }
}

impl std::fmt::Debug for SubscriberSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberSet")
            .field("subscriber_count", &self.len())
            .finish()
    }
}

//! Event gate: delivers notifications only for the current, live run.

use crate::cancellation::CancellationToken;
use crate::core::RunId;
use crate::events::{Notification, SubscriberSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Sink a worker pushes its notifications into.
pub trait RunEmitter: Send + Sync {
    /// Emits one notification.
    fn emit(&self, notification: Notification<'_>);
}

impl<F> RunEmitter for F
where
    F: Fn(Notification<'_>) + Send + Sync,
{
    fn emit(&self, notification: Notification<'_>) {
        self(notification);
    }
}

/// Decides which run may talk to subscribers.
///
/// The current-run and token check is repeated before every subscriber call
/// and no lock is held while a subscriber runs. Switching or stopping a run
/// never waits on a callback. Once the switch returns, the only event of the
/// old run that can still be seen is a callback that had already started.
/// Subscribers after it, and every later event, are dropped.
#[derive(Debug)]
pub struct EventGate {
    current: AtomicU64,
    subscribers: Arc<SubscriberSet>,
}

impl EventGate {
    /// Creates a gate with no current run.
    #[must_use]
    pub fn new(subscribers: Arc<SubscriberSet>) -> Self {
        Self {
            current: AtomicU64::new(0),
            subscribers,
        }
    }

    /// Makes `run` the only run whose events are delivered.
    pub fn set_current(&self, run: RunId) {
        self.current.store(run.get(), Ordering::SeqCst);
    }

    /// The run currently allowed to deliver, if any.
    #[must_use]
    pub fn current(&self) -> Option<RunId> {
        match self.current.load(Ordering::SeqCst) {
            0 => None,
            seq => Some(RunId::new(seq)),
        }
    }

    fn is_live(&self, run: RunId, token: &CancellationToken) -> bool {
        self.current() == Some(run) && !token.is_cancelled()
    }

    /// Delivers `notification` while `run` is current and not cancelled.
    ///
    /// Returns false if the run was already stale when delivery began.
    pub fn deliver(
        &self,
        run: RunId,
        token: &CancellationToken,
        notification: &Notification<'_>,
    ) -> bool {
        if !self.is_live(run, token) {
            trace!(%run, current = ?self.current(), "Dropping stale enrichment event");
            return false;
        }
        let called = self
            .subscribers
            .notify_while(run, notification, || self.is_live(run, token));
        if called < self.subscribers.len() {
            trace!(%run, called, "Enrichment run replaced during delivery");
        }
        true
    }
}

/// [`RunEmitter`] binding one run to the coordinator's gate.
#[derive(Debug, Clone)]
pub struct GateEmitter {
    gate: Arc<EventGate>,
    run: RunId,
    token: Arc<CancellationToken>,
}

impl GateEmitter {
    /// Creates an emitter for `run`.
    #[must_use]
    pub fn new(gate: Arc<EventGate>, run: RunId, token: Arc<CancellationToken>) -> Self {
        Self { gate, run, token }
    }
}

impl RunEmitter for GateEmitter {
    fn emit(&self, notification: Notification<'_>) {
        self.gate.deliver(self.run, &self.token, &notification);
    }
}

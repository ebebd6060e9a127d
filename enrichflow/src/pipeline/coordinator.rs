//! The enrichment coordinator: starts, stops and supersedes runs.

use super::gate::{EventGate, GateEmitter};
use super::run::{Run, RunReport, StatusCell};
use super::worker::EnrichmentWorker;
use crate::cancellation::{CancelReason, CancellationToken};
use crate::config::EnrichmentConfig;
use crate::core::{RunId, RunStatus, SearchResult};
use crate::errors::EnrichError;
use crate::events::{EnrichmentSubscriber, SubscriberSet, SubscriptionId};
use crate::providers::{ProviderRegistry, SharedProvider};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, Instrument};

struct ActiveRun {
    id: RunId,
    token: Arc<CancellationToken>,
    status: Arc<StatusCell>,
    handle: Option<JoinHandle<RunReport>>,
}

impl ActiveRun {
    fn is_active(&self) -> bool {
        let finished = self.handle.as_ref().is_some_and(JoinHandle::is_finished);
        self.status.get().is_active() && !finished
    }

    /// Cancels this run in favour of `by`. Returns true if it was still live.
    fn supersede(&self, by: RunId) -> bool {
        let live = self.is_active();
        self.token.cancel(CancelReason::Superseded);
        if live {
            debug!(superseded = %self.id, %by, "Superseding enrichment run");
        }
        live
    }
}

/// Public entry point of the pipeline.
///
/// Owns the provider registry and the subscriber set, and runs at most one
/// enrichment pass whose events reach subscribers. Every method is
/// non-blocking and may be called from the interactive thread.
///
/// # Example
///
/// ```rust,ignore
/// let coordinator = EnrichmentCoordinator::new(EnrichmentConfig::default());
/// coordinator.register_provider(Arc::new(connector_provider));
/// coordinator.subscribe(Arc::new(ui_bridge));
/// coordinator.enrich_async(results)?;
/// ```
pub struct EnrichmentCoordinator {
    registry: Arc<ProviderRegistry>,
    subscribers: Arc<SubscriberSet>,
    gate: Arc<EventGate>,
    config: EnrichmentConfig,
    runtime: Option<Handle>,
    next_run: AtomicU64,
    current: Mutex<Option<ActiveRun>>,
}

impl EnrichmentCoordinator {
    /// Creates a coordinator with an empty registry.
    ///
    /// Runs are spawned on the tokio runtime that is current when
    /// [`enrich_async`](Self::enrich_async) is called.
    #[must_use]
    pub fn new(config: EnrichmentConfig) -> Self {
        Self::with_registry(config, Arc::new(ProviderRegistry::new()))
    }

    /// Creates a coordinator over an existing, possibly shared, registry.
    #[must_use]
    pub fn with_registry(config: EnrichmentConfig, registry: Arc<ProviderRegistry>) -> Self {
        let subscribers = Arc::new(SubscriberSet::new());
        Self {
            registry,
            gate: Arc::new(EventGate::new(subscribers.clone())),
            subscribers,
            config,
            runtime: None,
            next_run: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    /// Spawns runs on `handle` instead of the ambient runtime.
    ///
    /// Lets a caller without a runtime context (a UI thread) use the pipeline.
    #[must_use]
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// The provider registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    /// Registers a provider for future runs.
    pub fn register_provider(&self, provider: SharedProvider) -> bool {
        self.registry.register(provider)
    }

    /// Unregisters a provider. Runs already started keep their snapshot.
    pub fn unregister_provider(&self, provider: &SharedProvider) -> bool {
        self.registry.unregister(provider)
    }

    /// Attaches a subscriber.
    pub fn subscribe(&self, subscriber: Arc<dyn EnrichmentSubscriber>) -> SubscriptionId {
        self.subscribers.subscribe(subscriber)
    }

    /// Detaches a subscriber.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Starts enriching `results` in the background, superseding any current run.
    ///
    /// Returns immediately. Fails if no tokio runtime is available or the
    /// runtime has shut down, in which case the current run, if any, is left
    /// untouched.
    pub fn enrich_async(&self, results: Vec<SearchResult>) -> Result<RunId, EnrichError> {
        let runtime = match &self.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current()
                .map_err(|e| EnrichError::scheduling(format!("no tokio runtime available: {e}")))?,
        };

        let id = RunId::new(self.next_run.fetch_add(1, Ordering::SeqCst) + 1);
        let run = Run::new(id, self.registry.snapshot());
        let token = run.token().clone();
        let status = run.status_cell().clone();
        let worker = EnrichmentWorker::new(run, &self.config);
        let emitter = GateEmitter::new(self.gate.clone(), id, token.clone());

        // The task waits for `start` so it cannot emit before it is current.
        let (start, started) = oneshot::channel::<()>();
        let span = info_span!("enrichment_run", run = %id);
        let handle = runtime.spawn(
            async move {
                let _ = started.await;
                worker.execute(results, &emitter).await
            }
            .instrument(span),
        );
        // A shut-down runtime hands back a task that is already cancelled.
        if handle.is_finished() {
            return Err(EnrichError::scheduling("enrichment runtime has shut down"));
        }

        let mut current = self.current.lock();
        if let Some(previous) = current.take() {
            previous.supersede(id);
        }
        self.gate.set_current(id);
        *current = Some(ActiveRun {
            id,
            token,
            status,
            handle: Some(handle),
        });
        drop(current);

        let _ = start.send(());
        Ok(id)
    }

    /// Cancels the current run, if any. Idempotent.
    ///
    /// Never waits for a subscriber callback. Once this returns, the stopped
    /// run starts no further callback.
    pub fn stop_enrichment(&self) {
        if let Some(active) = self.current.lock().as_ref() {
            if active.token.cancel(CancelReason::Stopped) {
                info!(run = %active.id, "Enrichment stop requested");
            }
        }
    }

    /// True while the current run is scheduled or executing.
    #[must_use]
    pub fn is_enriching(&self) -> bool {
        self.current.lock().as_ref().is_some_and(ActiveRun::is_active)
    }

    /// The id of the current run, if one was started.
    #[must_use]
    pub fn current_run(&self) -> Option<RunId> {
        self.current.lock().as_ref().map(|a| a.id)
    }

    /// The status of the current run, if one was started.
    #[must_use]
    pub fn run_status(&self) -> Option<RunStatus> {
        self.current.lock().as_ref().map(|a| a.status.get())
    }

    /// Waits for the current run's task to end and returns its report.
    ///
    /// Returns `Ok(None)` if there is no run, or if its report was already
    /// taken by an earlier call.
    pub async fn wait(&self) -> Result<Option<RunReport>, EnrichError> {
        let handle = self.current.lock().as_mut().and_then(|a| a.handle.take());
        match handle {
            None => Ok(None),
            Some(handle) => handle
                .await
                .map(Some)
                .map_err(|e| EnrichError::Internal(format!("enrichment task failed: {e}"))),
        }
    }
}

impl Default for EnrichmentCoordinator {
    fn default() -> Self {
        Self::new(EnrichmentConfig::default())
    }
}

impl std::fmt::Debug for EnrichmentCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentCoordinator")
            .field("registry", &self.registry)
            .field("subscribers", &self.subscribers)
            .field("current_run", &self.current_run())
            .field("is_enriching", &self.is_enriching())
            .finish_non_exhaustive()
    }
}

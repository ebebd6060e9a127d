//! The enrichment worker: one run, results × providers.

use super::gate::RunEmitter;
use super::run::{Run, RunReport, RunStats};
use crate::config::EnrichmentConfig;
use crate::core::{Context, RunStatus, SearchResult};
use crate::errors::{panic_message, ProviderError};
use crate::events::Notification;
use crate::providers::SharedProvider;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Executes a single [`Run`] to completion or until cancelled.
///
/// Results are visited in input order and providers in registration order,
/// one call at a time. The cancellation token is polled before each result
/// and, when configured, before each provider call.
#[derive(Debug)]
pub struct EnrichmentWorker {
    run: Run,
    provider_timeout: Option<Duration>,
    cancel_between_providers: bool,
}

impl EnrichmentWorker {
    /// Creates a worker for `run`.
    #[must_use]
    pub fn new(run: Run, config: &EnrichmentConfig) -> Self {
        Self {
            run,
            provider_timeout: config.provider_timeout(),
            cancel_between_providers: config.cancel_between_providers,
        }
    }

    /// The run this worker executes.
    #[must_use]
    pub fn run(&self) -> &Run {
        &self.run
    }

    /// Runs the pass, pushing notifications into `emitter`.
    pub async fn execute(self, mut results: Vec<SearchResult>, emitter: &dyn RunEmitter) -> RunReport {
        let started = Instant::now();
        let mut stats = RunStats::default();

        self.run.status_cell().transition(RunStatus::Running);
        info!(
            run = %self.run.id(),
            results = results.len(),
            providers = self.run.providers().len(),
            created_at = %self.run.created_at().to_rfc3339(),
            "Enrichment run started"
        );

        let status = self.enrich_all(&mut results, emitter, &mut stats).await;
        self.run.status_cell().transition(status);

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(
            run = %self.run.id(),
            status = %status,
            processed = stats.results_processed,
            contexts = stats.contexts_attached,
            errors = stats.provider_errors,
            duration_ms,
            "Enrichment run finished"
        );

        RunReport {
            run: self.run.id(),
            status,
            results,
            stats,
            started_at: self.run.created_at(),
            duration_ms,
        }
    }

    async fn enrich_all(
        &self,
        results: &mut [SearchResult],
        emitter: &dyn RunEmitter,
        stats: &mut RunStats,
    ) -> RunStatus {
        let token = self.run.token();

        let any_enabled = self.run.providers().iter().any(|p| p.is_enabled());
        if results.is_empty() || !any_enabled {
            if token.is_cancelled() {
                return self.run.cancelled_status();
            }
            debug!(run = %self.run.id(), "Nothing to enrich");
            emitter.emit(Notification::EnrichmentComplete);
            return RunStatus::Completed;
        }

        for (index, result) in results.iter_mut().enumerate() {
            if token.is_cancelled() {
                debug!(run = %self.run.id(), index, reason = ?token.reason(), "Run cancelled");
                return self.run.cancelled_status();
            }

            let mut attached = 0usize;
            for provider in self.run.providers() {
                if self.cancel_between_providers && token.is_cancelled() {
                    debug!(run = %self.run.id(), index, "Run cancelled between providers");
                    return self.run.cancelled_status();
                }
                if !provider.is_enabled() {
                    debug!(provider = %provider.name(), "Skipping disabled provider");
                    continue;
                }

                match self.call_provider(provider, result).await {
                    Ok(contexts) => {
                        for context in contexts {
                            result.attach_context(context);
                            attached += 1;
                        }
                    }
                    Err(err) => {
                        stats.provider_errors += 1;
                        warn!(
                            run = %self.run.id(),
                            index,
                            provider = %provider.name(),
                            error = %err.message,
                            "Context provider failed"
                        );
                        emitter.emit(Notification::ProviderError {
                            provider: provider.name(),
                            message: &err.message,
                        });
                    }
                }
            }

            stats.results_processed += 1;
            stats.contexts_attached += attached;
            debug!(
                run = %self.run.id(),
                index,
                search_id = %result.search_id(),
                attached,
                "Result enriched"
            );
            emitter.emit(Notification::ResultEnriched { index, result: &*result });
        }

        // A cancel that lands during the last result still counts as an early stop.
        if token.is_cancelled() {
            return self.run.cancelled_status();
        }
        emitter.emit(Notification::EnrichmentComplete);
        RunStatus::Completed
    }

    /// Calls one provider, folding errors, panics and timeouts into `ProviderError`.
    async fn call_provider(
        &self,
        provider: &SharedProvider,
        result: &SearchResult,
    ) -> Result<Vec<Context>, ProviderError> {
        let name = provider.name();
        let call = AssertUnwindSafe(provider.get_context(result)).catch_unwind();

        let outcome = match self.provider_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                    return Err(ProviderError::timed_out(name, ms));
                }
            },
            None => call.await,
        };

        match outcome {
            Ok(Ok(contexts)) => Ok(contexts),
            Ok(Err(err)) => Err(ProviderError::new(name, err.message)),
            Err(payload) => Err(ProviderError::panicked(name, &panic_message(payload.as_ref()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancelReason;
    use crate::core::{EnrichmentEvent, RunId};
    use crate::testing::{
        sample_results, FailingProvider, PanickingProvider, RecordingProvider, SlowProvider,
        StaticProvider, ToggleProvider,
    };
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<EnrichmentEvent>>,
    }

    impl RunEmitter for Recorder {
        fn emit(&self, notification: Notification<'_>) {
            self.events.lock().push(notification.to_event(RunId::new(1)));
        }
    }

    impl Recorder {
        fn types(&self) -> Vec<&'static str> {
            self.events.lock().iter().map(EnrichmentEvent::event_type).collect()
        }

        fn indices(&self) -> Vec<usize> {
            self.events.lock().iter().filter_map(EnrichmentEvent::index).collect()
        }
    }

    fn worker(providers: Vec<SharedProvider>) -> EnrichmentWorker {
        EnrichmentWorker::new(Run::new(RunId::new(1), providers), &EnrichmentConfig::default())
    }

    #[tokio::test]
    async fn test_one_result_disabled_provider_not_called() {
        let p1: SharedProvider = Arc::new(StaticProvider::new("P1", vec!["ctxA"]));
        let p2 = Arc::new(ToggleProvider::new("P2", false));
        let recorder = Recorder::default();

        let report = worker(vec![p1, p2.clone() as SharedProvider])
            .execute(sample_results(1), &recorder)
            .await;

        assert_eq!(recorder.types(), vec!["enrichment.result_enriched", "enrichment.complete"]);
        assert_eq!(p2.call_count(), 0);

        let contexts = report.results[0].contexts();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].term(), "ctxA");
        assert_eq!(report.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_throwing_provider_isolated() {
        let thrower: SharedProvider = Arc::new(FailingProvider::new("Pthrow", "lookup failed"));
        let recorder = Recorder::default();

        let report = worker(vec![thrower]).execute(sample_results(2), &recorder).await;

        assert_eq!(
            recorder.types(),
            vec![
                "enrichment.provider_error",
                "enrichment.result_enriched",
                "enrichment.provider_error",
                "enrichment.result_enriched",
                "enrichment.complete",
            ]
        );
        assert!(report.results.iter().all(|r| r.contexts().is_empty()));
        assert_eq!(report.stats.provider_errors, 2);
        assert_eq!(report.stats.results_processed, 2);
    }

    #[tokio::test]
    async fn test_error_isolation_keeps_other_provider_contexts() {
        let a: SharedProvider = Arc::new(FailingProvider::new("A", "down"));
        let b: SharedProvider = Arc::new(StaticProvider::new("B", vec!["b1", "b2"]));
        let recorder = Recorder::default();

        let report = worker(vec![a, b]).execute(sample_results(3), &recorder).await;

        for result in &report.results {
            let terms: Vec<_> = result.contexts().iter().map(Context::term).collect();
            assert_eq!(terms, vec!["b1", "b2"]);
        }
        let errors: Vec<_> = recorder
            .events
            .lock()
            .iter()
            .filter_map(|e| match e {
                EnrichmentEvent::ProviderError { provider, .. } => Some(provider.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(errors, vec!["A", "A", "A"]);
        assert_eq!(report.stats.contexts_attached, 6);
    }

    #[tokio::test]
    async fn test_empty_results_complete_immediately() {
        let p1: SharedProvider = Arc::new(StaticProvider::new("P1", vec!["x"]));
        let recorder = Recorder::default();

        let report = worker(vec![p1]).execute(Vec::new(), &recorder).await;

        assert_eq!(recorder.types(), vec!["enrichment.complete"]);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_report_carries_run_creation_time() {
        let run = Run::new(RunId::new(1), Vec::new());
        let created_at = run.created_at();
        let recorder = Recorder::default();

        let report = EnrichmentWorker::new(run, &EnrichmentConfig::default())
            .execute(sample_results(2), &recorder)
            .await;

        assert_eq!(report.started_at, created_at);
        assert!(report.started_at <= chrono::Utc::now());
    }

    #[tokio::test]
    async fn test_empty_snapshot_complete_immediately() {
        let recorder = Recorder::default();
        let report = worker(Vec::new()).execute(sample_results(4), &recorder).await;

        assert_eq!(recorder.types(), vec!["enrichment.complete"]);
        assert_eq!(report.stats.results_processed, 0);
    }

    #[tokio::test]
    async fn test_all_disabled_counts_as_empty() {
        let off = Arc::new(ToggleProvider::new("Off", false));
        let recorder = Recorder::default();

        worker(vec![off.clone() as SharedProvider]).execute(sample_results(3), &recorder).await;

        assert_eq!(recorder.types(), vec!["enrichment.complete"]);
        assert_eq!(off.call_count(), 0);
    }

    #[tokio::test]
    async fn test_indices_in_input_order() {
        let p: SharedProvider = Arc::new(StaticProvider::new("P", vec!["x"]));
        let recorder = Recorder::default();

        worker(vec![p]).execute(sample_results(10), &recorder).await;

        assert_eq!(recorder.indices(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_providers_called_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let first: SharedProvider = Arc::new(RecordingProvider::new("first", log.clone()));
        let second: SharedProvider = Arc::new(RecordingProvider::new("second", log.clone()));
        let recorder = Recorder::default();

        worker(vec![first, second]).execute(sample_results(2), &recorder).await;

        assert_eq!(
            *log.lock(),
            vec![
                "first:result-0".to_string(),
                "second:result-0".to_string(),
                "first:result-1".to_string(),
                "second:result-1".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let p: SharedProvider = Arc::new(StaticProvider::new("P", vec!["x"]));
        let w = worker(vec![p]);
        w.run().token().cancel(CancelReason::Stopped);
        let recorder = Recorder::default();

        let report = w.execute(sample_results(3), &recorder).await;

        assert!(recorder.types().is_empty());
        assert_eq!(report.status, RunStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_after_k_results() {
        let p: SharedProvider = Arc::new(StaticProvider::new("P", vec!["x"]));
        let w = worker(vec![p]);
        let token = w.run().token().clone();

        let recorder = |n: Notification<'_>| {
            if let Notification::ResultEnriched { index: 1, .. } = n {
                token.cancel(CancelReason::Superseded);
            }
        };

        let report = w.execute(sample_results(5), &recorder).await;

        assert_eq!(report.stats.results_processed, 2);
        assert_eq!(report.status, RunStatus::Superseded);
        assert_eq!(report.results[1].contexts().len(), 1);
        assert!(report.results[2].contexts().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_between_providers() {
        let first = Arc::new(ToggleProvider::new("first", true));
        let second = Arc::new(ToggleProvider::new("second", true));
        let run = Run::new(
            RunId::new(1),
            vec![first.clone() as SharedProvider, second.clone() as SharedProvider],
        );
        let token = run.token().clone();
        first.cancel_on_call(token);

        let config = EnrichmentConfig::default().with_cancel_between_providers(true);
        let recorder = Recorder::default();
        let report = EnrichmentWorker::new(run, &config)
            .execute(sample_results(2), &recorder)
            .await;

        assert_eq!(first.call_count(), 1);
        assert_eq!(second.call_count(), 0);
        assert!(recorder.types().is_empty());
        assert_eq!(report.status, RunStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_in_flight_call_completes_without_inner_polling() {
        let first = Arc::new(ToggleProvider::new("first", true));
        let second = Arc::new(ToggleProvider::new("second", true));
        let run = Run::new(
            RunId::new(1),
            vec![first.clone() as SharedProvider, second.clone() as SharedProvider],
        );
        first.cancel_on_call(run.token().clone());

        let recorder = Recorder::default();
        let report = EnrichmentWorker::new(run, &EnrichmentConfig::default())
            .execute(sample_results(2), &recorder)
            .await;

        // Only the outer loop polls, so result 0 finishes with both providers.
        assert_eq!(second.call_count(), 1);
        assert_eq!(recorder.indices(), vec![0]);
        assert_eq!(report.status, RunStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_during_last_result_skips_completion() {
        let stopper = Arc::new(ToggleProvider::new("stopper", true));
        let run = Run::new(RunId::new(1), vec![stopper.clone() as SharedProvider]);
        stopper.cancel_on_call(run.token().clone());

        let recorder = Recorder::default();
        let report = EnrichmentWorker::new(run, &EnrichmentConfig::default())
            .execute(sample_results(1), &recorder)
            .await;

        assert_eq!(recorder.types(), vec!["enrichment.result_enriched"]);
        assert_eq!(report.status, RunStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_panicking_provider_reported() {
        let panicker: SharedProvider = Arc::new(PanickingProvider::new("Bad"));
        let good: SharedProvider = Arc::new(StaticProvider::new("Good", vec!["ok"]));
        let recorder = Recorder::default();

        let report = worker(vec![panicker, good]).execute(sample_results(1), &recorder).await;

        let events = recorder.events.lock();
        match &events[0] {
            EnrichmentEvent::ProviderError { provider, message, .. } => {
                assert_eq!(provider, "Bad");
                assert!(message.starts_with("provider panicked"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(report.results[0].contexts().len(), 1);
    }

    #[tokio::test]
    async fn test_provider_timeout() {
        let slow: SharedProvider = Arc::new(SlowProvider::with_delay_ms("Slow", 5_000));
        let config = EnrichmentConfig::default().with_provider_timeout(Duration::from_millis(20));
        let recorder = Recorder::default();

        let report = EnrichmentWorker::new(Run::new(RunId::new(1), vec![slow]), &config)
            .execute(sample_results(1), &recorder)
            .await;

        let events = recorder.events.lock();
        match &events[0] {
            EnrichmentEvent::ProviderError { message, .. } => {
                assert_eq!(message, "timed out after 20ms");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_error_uses_registered_provider_name() {
        let p: SharedProvider = Arc::new(FailingProvider::new("Registered", "x").reporting_as("Other"));
        let recorder = Recorder::default();

        worker(vec![p]).execute(sample_results(1), &recorder).await;

        let events = recorder.events.lock();
        assert!(matches!(
            &events[0],
            EnrichmentEvent::ProviderError { provider, .. } if provider == "Registered"
        ));
    }
}

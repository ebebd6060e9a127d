//! End-to-end tests through the coordinator.

#[cfg(test)]
mod tests {
    use crate::config::EnrichmentConfig;
    use crate::core::{ActionHandle, Context, ContextAction, RunId, RunStatus, SearchResult};
    use crate::errors::ProviderError;
    use crate::events::{CollectingSubscriber, EnrichmentSubscriber, LoggingSubscriber};
    use crate::pipeline::EnrichmentCoordinator;
    use crate::providers::{FnProvider, SharedProvider};
    use crate::testing::{
        assert_not_completed, assert_run_completed, assert_run_silent, sample_results,
        GatedProvider, SlowProvider, StaticProvider, ToggleProvider,
    };
    use mockall::{mock, Sequence};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    mock! {
        Subscriber {}

        impl EnrichmentSubscriber for Subscriber {
            fn on_result_enriched(&self, run: RunId, index: usize, result: &SearchResult);
            fn on_enrichment_complete(&self, run: RunId);
            fn on_error(&self, run: RunId, provider: &str, message: &str);
        }
    }

    struct PanickingSubscriber;

    impl EnrichmentSubscriber for PanickingSubscriber {
        fn on_result_enriched(&self, _run: RunId, index: usize, _result: &SearchResult) {
            panic!("subscriber failed on {index}");
        }

        fn on_enrichment_complete(&self, _run: RunId) {
            panic!("subscriber failed on completion");
        }
    }

    fn setup(providers: Vec<SharedProvider>) -> (EnrichmentCoordinator, Arc<CollectingSubscriber>) {
        let coordinator = EnrichmentCoordinator::new(EnrichmentConfig::default());
        for provider in providers {
            coordinator.register_provider(provider);
        }
        let collector = Arc::new(CollectingSubscriber::new());
        coordinator.subscribe(collector.clone());
        (coordinator, collector)
    }

    #[tokio::test]
    async fn test_closure_provider_with_actions() {
        let opened = Arc::new(Mutex::new(Vec::new()));
        let log = opened.clone();
        let open = ActionHandle::new(move |result: &SearchResult| {
            log.lock().push(result.search_id().to_string());
        });

        let connector: SharedProvider = Arc::new(FnProvider::new(
            "Connector",
            move |result: &SearchResult| -> Result<Vec<Context>, ProviderError> {
                let row = result
                    .fields()
                    .get("Row")
                    .ok_or_else(|| ProviderError::new("Connector", "no row"))?;
                Ok(vec![Context::builder("Connector", format!("part-{row}"))
                    .data("Family", "MQS")
                    .action(ContextAction::new("Open", open.clone()).with_tooltip("Open datasheet"))
                    .build()])
            },
        ));
        let (coordinator, collector) = setup(vec![connector]);

        let run = tokio_test::assert_ok!(coordinator.enrich_async(sample_results(3)));
        coordinator.wait().await.unwrap();

        assert_run_completed(&collector, run, 3);
        let results = collector.enriched_results();
        let context = &results[2].contexts()[0];
        assert_eq!(context.term(), "part-2");
        assert_eq!(context.data().get("Family"), Some("MQS"));

        let action = &context.actions()[0];
        assert_eq!(action.tooltip.as_deref(), Some("Open datasheet"));
        action.handle.invoke(&results[2]);
        assert_eq!(*opened.lock(), vec!["result-2".to_string()]);
    }

    #[tokio::test]
    async fn test_rapid_supersession_delivers_only_latest() {
        let slow: SharedProvider = Arc::new(SlowProvider::with_delay_ms("Slow", 1));
        let (coordinator, collector) = setup(vec![slow]);

        let runs: Vec<RunId> = (0..5)
            .map(|i| coordinator.enrich_async(sample_results(10 + i)).unwrap())
            .collect();
        coordinator.wait().await.unwrap();

        let latest = runs[4];
        assert_run_completed(&collector, latest, 14);
        for run in &runs[..4] {
            assert_not_completed(&collector, *run);
        }
        assert_eq!(collector.runs(), vec![latest]);
    }

    #[tokio::test]
    async fn test_stop_then_restart() {
        let gated = Arc::new(GatedProvider::new("Gated"));
        let (coordinator, collector) = setup(vec![gated.clone() as SharedProvider]);

        let stopped = coordinator.enrich_async(sample_results(4)).unwrap();
        gated.wait_until_entered().await;
        coordinator.stop_enrichment();
        gated.release_all();
        let report = coordinator.wait().await.unwrap().unwrap();
        assert_eq!(report.status, RunStatus::Cancelled);
        assert_run_silent(&collector, stopped);

        let restarted = coordinator.enrich_async(sample_results(2)).unwrap();
        coordinator.wait().await.unwrap();
        assert_run_completed(&collector, restarted, 2);
    }

    #[tokio::test]
    async fn test_provider_toggled_between_runs() {
        let toggle = Arc::new(ToggleProvider::new("Toggle", true));
        let fixed: SharedProvider = Arc::new(StaticProvider::new("Fixed", vec!["f"]));
        let (coordinator, _collector) = setup(vec![toggle.clone() as SharedProvider, fixed]);

        coordinator.enrich_async(sample_results(3)).unwrap();
        coordinator.wait().await.unwrap();
        assert_eq!(toggle.call_count(), 3);

        toggle.set_enabled(false);
        coordinator.enrich_async(sample_results(3)).unwrap();
        let report = coordinator.wait().await.unwrap().unwrap();
        assert_eq!(toggle.call_count(), 3);
        assert_eq!(report.stats.contexts_attached, 3);
    }

    #[tokio::test]
    async fn test_panicking_subscriber_isolated() {
        let p: SharedProvider = Arc::new(StaticProvider::new("P", vec!["x"]));
        let coordinator = EnrichmentCoordinator::default();
        coordinator.register_provider(p);
        coordinator.subscribe(Arc::new(PanickingSubscriber));
        let collector = Arc::new(CollectingSubscriber::new());
        coordinator.subscribe(collector.clone());

        let run = coordinator.enrich_async(sample_results(3)).unwrap();
        let report = coordinator.wait().await.unwrap().unwrap();

        assert!(report.is_complete());
        assert_run_completed(&collector, run, 3);
    }

    #[tokio::test]
    async fn test_mock_subscriber_sees_ordered_events() {
        let failing = Arc::new(FnProvider::new("Flaky", |result: &SearchResult| {
            if result.search_id() == "result-1" {
                Err(ProviderError::new("Flaky", "timeout"))
            } else {
                Ok(Vec::new())
            }
        }));

        let mut mock = MockSubscriber::new();
        let mut seq = Sequence::new();
        mock.expect_on_result_enriched()
            .withf(|_, index, _| *index == 0)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        mock.expect_on_error()
            .withf(|_, provider, message| provider.to_string() == "Flaky" && message.to_string() == "timeout")
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        mock.expect_on_result_enriched()
            .withf(|_, index, _| *index == 1)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        mock.expect_on_enrichment_complete()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let coordinator = EnrichmentCoordinator::default();
        coordinator.register_provider(failing);
        coordinator.subscribe(Arc::new(mock));
        let collector = Arc::new(CollectingSubscriber::new());
        coordinator.subscribe(collector.clone());

        let run = coordinator.enrich_async(sample_results(2)).unwrap();
        coordinator.wait().await.unwrap();

        assert_run_completed(&collector, run, 2);
        assert_eq!(collector.errors(), vec![("Flaky".to_string(), "timeout".to_string())]);
        // Dropping the coordinator drops the mock, which verifies call counts.
        drop(coordinator);
    }

    #[tokio::test]
    async fn test_logging_subscriber_alongside_others() {
        let p: SharedProvider = Arc::new(StaticProvider::new("P", vec!["x"]));
        let (coordinator, collector) = setup(vec![p]);
        coordinator.subscribe(Arc::new(LoggingSubscriber::debug()));

        let run = coordinator.enrich_async(sample_results(2)).unwrap();
        coordinator.wait().await.unwrap();

        assert_run_completed(&collector, run, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_restarts_from_many_tasks() {
        let slow: SharedProvider = Arc::new(SlowProvider::with_delay_ms("Slow", 1));
        let coordinator = Arc::new(EnrichmentCoordinator::default());
        coordinator.register_provider(slow);
        let collector = Arc::new(CollectingSubscriber::new());
        coordinator.subscribe(collector.clone());

        let started = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = coordinator.clone();
                let started = started.clone();
                tokio::spawn(async move {
                    coordinator.enrich_async(sample_results(5)).unwrap();
                    started.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(started.load(Ordering::SeqCst), 8);

        let latest = coordinator.current_run().unwrap();
        let report = tokio::time::timeout(Duration::from_secs(5), coordinator.wait())
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(report.run, latest);
        assert_run_completed(&collector, latest, 5);
    }

    #[test]
    fn test_wait_from_blocking_caller() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let p: SharedProvider = Arc::new(StaticProvider::new("P", vec!["x"]));
        let coordinator = EnrichmentCoordinator::default().with_runtime(runtime.handle().clone());
        coordinator.register_provider(p);

        coordinator.enrich_async(sample_results(2)).unwrap();
        let report = tokio_test::block_on(coordinator.wait()).unwrap().unwrap();

        assert_eq!(report.stats.results_processed, 2);
        assert_eq!(report.results[1].contexts()[0].provider(), "P");
    }
}

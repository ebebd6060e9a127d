//! Assertions over collected enrichment events.

use crate::core::{EnrichmentEvent, RunId};
use crate::events::CollectingSubscriber;

/// Asserts that `run` enriched indices `0..expected` in order, then completed once.
pub fn assert_run_completed(collector: &CollectingSubscriber, run: RunId, expected: usize) {
    let events: Vec<_> = collector
        .events()
        .into_iter()
        .filter(|e| e.run() == run)
        .collect();
    let indices: Vec<_> = events.iter().filter_map(EnrichmentEvent::index).collect();
    assert_eq!(
        indices,
        (0..expected).collect::<Vec<_>>(),
        "Run {run} did not enrich results in order"
    );

    let completions = events
        .iter()
        .filter(|e| matches!(e, EnrichmentEvent::EnrichmentComplete { .. }))
        .count();
    assert_eq!(completions, 1, "Expected one completion for {run}, got {completions}");
    assert!(
        matches!(events.last(), Some(EnrichmentEvent::EnrichmentComplete { .. })),
        "Completion for {run} was not the last event"
    );
}

/// Asserts that no event of `run` reached the subscriber.
pub fn assert_run_silent(collector: &CollectingSubscriber, run: RunId) {
    let leaked: Vec<_> = collector
        .events()
        .into_iter()
        .filter(|e| e.run() == run)
        .map(|e| e.event_type())
        .collect();
    assert!(leaked.is_empty(), "Run {run} delivered events: {leaked:?}");
}

/// Asserts that `run` never completed.
pub fn assert_not_completed(collector: &CollectingSubscriber, run: RunId) {
    assert!(
        !collector
            .events()
            .iter()
            .any(|e| e.run() == run && matches!(e, EnrichmentEvent::EnrichmentComplete { .. })),
        "Run {run} reported completion"
    );
}

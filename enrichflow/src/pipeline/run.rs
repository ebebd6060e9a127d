//! Run-scoped state shared between a worker and its coordinator.

use crate::cancellation::{CancelReason, CancellationToken};
use crate::core::{RunId, RunStatus, SearchResult};
use crate::providers::SharedProvider;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Live status of a run, written by the worker and read by the coordinator.
#[derive(Debug, Default)]
pub struct StatusCell {
    status: RwLock<RunStatus>,
}

impl StatusCell {
    /// Creates a cell in the `Scheduled` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current status.
    #[must_use]
    pub fn get(&self) -> RunStatus {
        *self.status.read()
    }

    /// Moves to `next` if the transition is legal. Returns whether it moved.
    pub fn transition(&self, next: RunStatus) -> bool {
        let mut status = self.status.write();
        if status.can_transition_to(next) {
            *status = next;
            true
        } else {
            debug!(from = %*status, to = %next, "Ignoring invalid run status transition");
            false
        }
    }
}

/// One enrichment pass: id, provider snapshot and cancellation token.
#[derive(Debug)]
pub struct Run {
    id: RunId,
    providers: Vec<SharedProvider>,
    token: Arc<CancellationToken>,
    status: Arc<StatusCell>,
    created_at: DateTime<Utc>,
}

impl Run {
    /// Creates a scheduled run over a provider snapshot.
    #[must_use]
    pub fn new(id: RunId, providers: Vec<SharedProvider>) -> Self {
        Self {
            id,
            providers,
            token: Arc::new(CancellationToken::new()),
            status: Arc::new(StatusCell::new()),
            created_at: Utc::now(),
        }
    }

    /// The run's sequence id.
    #[must_use]
    pub fn id(&self) -> RunId {
        self.id
    }

    /// Providers fixed at run start, in registration order.
    #[must_use]
    pub fn providers(&self) -> &[SharedProvider] {
        &self.providers
    }

    /// The run's cancellation token.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// The run's shared status cell.
    #[must_use]
    pub fn status_cell(&self) -> &Arc<StatusCell> {
        &self.status
    }

    /// When the run was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The terminal status matching the token's cancellation reason.
    #[must_use]
    pub fn cancelled_status(&self) -> RunStatus {
        match self.token.reason() {
            Some(CancelReason::Superseded) => RunStatus::Superseded,
            Some(CancelReason::Stopped) | None => RunStatus::Cancelled,
        }
    }
}

/// Counters accumulated while a run executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Results for which `on_result_enriched` was emitted.
    pub results_processed: usize,
    /// Contexts appended across all results.
    pub contexts_attached: usize,
    /// Failed provider calls.
    pub provider_errors: usize,
}

/// Final outcome of a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The run.
    pub run: RunId,
    /// Terminal status.
    pub status: RunStatus,
    /// The input batch with whatever contexts were attached before the run ended.
    pub results: Vec<SearchResult>,
    /// Counters.
    pub stats: RunStats,
    /// When the run was created.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
}

impl RunReport {
    /// Returns true if the run processed every result.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Converts to a dictionary representation, without the results.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("run".to_string(), serde_json::json!(self.run.get()));
        map.insert("status".to_string(), serde_json::json!(self.status.to_string()));
        map.insert("result_count".to_string(), serde_json::json!(self.results.len()));
        map.insert(
            "results_processed".to_string(),
            serde_json::json!(self.stats.results_processed),
        );
        map.insert(
            "contexts_attached".to_string(),
            serde_json::json!(self.stats.contexts_attached),
        );
        map.insert(
            "provider_errors".to_string(),
            serde_json::json!(self.stats.provider_errors),
        );
        map.insert(
            "started_at".to_string(),
            serde_json::json!(self.started_at.to_rfc3339()),
        );
        map.insert("duration_ms".to_string(), serde_json::json!(self.duration_ms));
        map
    }
}

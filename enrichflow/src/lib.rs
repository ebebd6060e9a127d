//! # Enrichflow
//!
//! Background context enrichment for search results.
//!
//! A search produces a batch of [`SearchResult`](core::SearchResult) rows.
//! Enrichflow walks that batch off the interactive thread, asks every
//! registered [`ContextProvider`](providers::ContextProvider) for extra
//! information about each row, and streams the enriched rows back to
//! subscribers one at a time:
//!
//! - **Pluggable providers**: register and unregister at any time; each run
//!   works on the snapshot taken when it started
//! - **Partial results**: one notification per enriched row, in input order
//! - **Supersession**: starting a new run silences the previous one
//! - **Fault isolation**: a failing or panicking provider costs one error
//!   event, never the run
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use enrichflow::prelude::*;
//!
//! let coordinator = EnrichmentCoordinator::new(EnrichmentConfig::from_env()?);
//! coordinator.register_provider(Arc::new(ConnectorProvider::new(db)));
//! coordinator.subscribe(Arc::new(ResultTableBridge::new(view)));
//!
//! // Returns immediately; events arrive as rows are enriched.
//! coordinator.enrich_async(results)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod providers;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{CancelReason, CancellationToken};
    pub use crate::config::{EnrichmentConfig, LogFormat};
    pub use crate::core::{
        ActionHandle, Context, ContextAction, EnrichmentEvent, Fields, RunId, RunStatus,
        SearchResult,
    };
    pub use crate::errors::{EnrichError, ProviderError};
    pub use crate::events::{
        ChannelSubscriber, CollectingSubscriber, EnrichmentSubscriber, LoggingSubscriber,
        NoOpSubscriber, SubscriptionId,
    };
    pub use crate::observability::init_tracing;
    pub use crate::pipeline::{EnrichmentCoordinator, RunReport, RunStats};
    pub use crate::providers::{ContextProvider, FnProvider, ProviderRegistry, SharedProvider};
}

//! Enrichment execution.
//!
//! This module provides:
//! - Run state shared between a worker and its coordinator
//! - The background worker that walks a batch of results
//! - The event gate that keeps stale runs away from subscribers
//! - The coordinator, the public entry point

mod coordinator;
mod gate;
#[cfg(test)]
mod integration_tests;
mod run;
mod worker;

pub use coordinator::EnrichmentCoordinator;
pub use gate::{EventGate, GateEmitter, RunEmitter};
pub use run::{Run, RunReport, RunStats, StatusCell};
pub use worker::EnrichmentWorker;

//! Testing utilities for enrichment pipelines.
//!
//! This module provides:
//! - Mock context providers
//! - Sample search results
//! - Assertions over collected events

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_not_completed, assert_run_completed, assert_run_silent};
pub use fixtures::{sample_result, sample_results};
pub use mocks::{
    FailingProvider, GatedProvider, PanickingProvider, RecordingProvider, SlowProvider,
    StaticProvider, ToggleProvider,
};

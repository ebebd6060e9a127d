//! Cooperative cancellation for enrichment runs.

mod token;

pub use token::{CancelReason, CancellationToken};

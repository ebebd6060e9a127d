//! Test fixtures for enrichment runs.

use crate::core::SearchResult;

/// Builds `n` results with ids `result-0`, `result-1`, ...
#[must_use]
pub fn sample_results(n: usize) -> Vec<SearchResult> {
    (0..n).map(sample_result).collect()
}

/// Builds one result with a few typical columns.
#[must_use]
pub fn sample_result(index: usize) -> SearchResult {
    SearchResult::with_id(format!("result-{index}"), "fixtures")
        .with_field("Name", format!("item {index}"))
        .with_field("Row", index.to_string())
}

//! Test fixtures and helpers.
//!
//! Value tables and harness configurations shared by marble tests.

use marble_core::config::HarnessConfig;
use marble_core::harness::MarbleHarness;
use marble_core::values::MarbleValues;

/// Labels `a`, `b`, `c`, ... emit 1, 2, 3, ...; `#` emits `"error"`.
#[must_use]
pub fn numbers() -> MarbleValues<i64, String> {
    ('a'..='z')
        .zip(1..)
        .collect::<MarbleValues<i64, String>>()
        .with_error("error".to_string())
}

/// Every label emits itself as a `String`; `#` emits `"error"`.
#[must_use]
pub fn letters() -> MarbleValues<String, String> {
    MarbleValues::labels()
}

/// Values that are lists of search results, keyed by label.
///
/// `a` emits `["apple"]`, `b` emits `["banana", "blueberry"]`, `e` emits no
/// results.
#[must_use]
pub fn search_results() -> MarbleValues<Vec<String>, String> {
    MarbleValues::new()
        .with('a', vec!["apple".to_string()])
        .with('b', vec!["banana".to_string(), "blueberry".to_string()])
        .with('e', Vec::new())
        .with_error("search failed".to_string())
}

/// Harness that stops after `max_frames`, for pipelines that never finish.
#[must_use]
pub fn bounded_harness(max_frames: u64) -> MarbleHarness {
    MarbleHarness::with_config(HarnessConfig::bounded(max_frames))
}

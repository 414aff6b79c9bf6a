//! Confidence scoring against the fixed metric checklist.

use serde::Serialize;

use crate::models::{ExtractedMetrics, CHECKLIST};

/// Default share of checklist fields a document needs to be accepted.
pub const DEFAULT_MIN_CONFIDENCE_RATIO: f64 = 0.30;

/// Score of one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceScore {
    pub found: usize,
    pub total: usize,
    /// `min(10, 10 * found / total)`, one decimal.
    pub confidence: f64,
    pub accepted: bool,
}

/// Number of checklist fields needed at `ratio`, i.e. `ceil(ratio * N)`.
pub fn required_fields(ratio: f64) -> usize {
    let total = CHECKLIST.len() as f64;
    // A ratio that lands on a whole field count can carry float error just
    // above it (2.000000000000001); nudge down before ceil so it needs 2, not 3.
    ((ratio * total) - 1e-9).ceil().max(0.0) as usize
}

/// Score `metrics`; `min_ratio` is the acceptance threshold.
pub fn score(metrics: &ExtractedMetrics, min_ratio: f64) -> ConfidenceScore {
    let found = metrics.found_count();
    let total = CHECKLIST.len();
    let raw = (10.0 * found as f64 / total as f64).min(10.0);

    ConfidenceScore {
        found,
        total,
        confidence: (raw * 10.0).round() / 10.0,
        accepted: found >= required_fields(min_ratio),
    }
}

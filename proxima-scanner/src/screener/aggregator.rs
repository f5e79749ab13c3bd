//! Ranking and scan result assembly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::classifier::{CandidateRecord, Classification};
use crate::universe::UniverseOrigin;

// ============================================================================
// Funnel Statistics
// ============================================================================

/// Per-stage counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Symbols in the resolved universe
    pub universe_size: usize,
    /// Symbols whose fetch completed (usable or not)
    pub scanned: usize,
    /// Fetches that produced no usable series
    pub unavailable: usize,
    /// Usable series outside the proximity threshold
    pub rejected: usize,
    /// Candidates that passed the filter
    pub accepted: usize,
}

impl ScanStats {
    /// Symbols never attempted because the run timed out.
    pub fn skipped(&self) -> usize {
        self.universe_size.saturating_sub(self.scanned)
    }

    /// Share of scanned symbols that were accepted, in percent.
    pub fn acceptance_rate(&self) -> f64 {
        if self.scanned == 0 {
            0.0
        } else {
            self.accepted as f64 / self.scanned as f64 * 100.0
        }
    }
}

// ============================================================================
// Scan Result
// ============================================================================

/// Run metadata known before ranking.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub id: String,
    pub origin: UniverseOrigin,
    pub stats: ScanStats,
    pub config_summary: String,
    pub timed_out: bool,
    pub started_at: DateTime<Utc>,
}

impl RunSummary {
    /// Start a run now, with a `scan_YYYYmmdd_HHMMSS` id.
    pub fn start(origin: UniverseOrigin, universe_size: usize, config_summary: String) -> Self {
        let started_at = Utc::now();
        Self {
            id: format!("scan_{}", started_at.format("%Y%m%d_%H%M%S")),
            origin,
            stats: ScanStats {
                universe_size,
                ..ScanStats::default()
            },
            config_summary,
            timed_out: false,
            started_at,
        }
    }
}

/// Ranked output of one screening run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Scan ID (timestamp-based)
    pub id: String,
    /// Accepted candidates, ranked
    pub candidates: Vec<CandidateRecord>,
    pub universe_origin: UniverseOrigin,
    pub stats: ScanStats,
    /// Thresholds used, for report headers
    pub config_summary: String,
    /// Whether the global run timeout cut the scan short
    pub timed_out: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: f64,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn count_by_classification(&self, classification: Classification) -> usize {
        self.candidates
            .iter()
            .filter(|c| c.classification == classification)
            .count()
    }

    /// Summary string for logging.
    pub fn summary(&self) -> String {
        format!(
            "Scanned {} of {} tickers in {:.1}s: {} matched ({:.1}%; {} bullish, {} recovery), {} unavailable",
            self.stats.scanned,
            self.stats.universe_size,
            self.duration_secs,
            self.candidates.len(),
            self.stats.acceptance_rate(),
            self.count_by_classification(Classification::Bullish),
            self.count_by_classification(Classification::Recovery),
            self.stats.unavailable,
        )
    }
}

/// Rank order: rvol descending, then ticker ascending.
pub fn rank_order(a: &CandidateRecord, b: &CandidateRecord) -> Ordering {
    b.rvol
        .total_cmp(&a.rvol)
        .then_with(|| a.ticker.cmp(&b.ticker))
}

/// Rank candidates and attach run metadata. An empty candidate list is a
/// valid, empty result.
pub fn aggregate(mut candidates: Vec<CandidateRecord>, run: RunSummary) -> ScanResult {
    candidates.sort_by(rank_order);

    let completed_at = Utc::now();
    let duration_secs = (completed_at - run.started_at).num_milliseconds() as f64 / 1000.0;

    ScanResult {
        id: run.id,
        candidates,
        universe_origin: run.origin,
        stats: run.stats,
        config_summary: run.config_summary,
        timed_out: run.timed_out,
        started_at: run.started_at,
        completed_at,
        duration_secs,
    }
}

// ============================================================================
// Tests
// ============================================================================

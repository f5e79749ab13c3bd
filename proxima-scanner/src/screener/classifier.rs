//! Proximity filter and classifier.
//!
//! A ticker is accepted when its latest close sits within the proximity
//! threshold of either moving average. Accepted tickers are labelled with
//! the nearer-priority condition and a trend classification.

use proxima_common::ScreenConfig;
use serde::{Deserialize, Serialize};

use crate::data::TickerSymbol;
use crate::enrichment::Enrichment;
use crate::signal::SignalSnapshot;

// ============================================================================
// Labels
// ============================================================================

/// Trend classification of an accepted ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// Ordinary pullback toward an average
    Bullish,
    /// Deep drawdown over the performance lookback
    Recovery,
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bullish => "Bullish",
            Self::Recovery => "Recovery",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which average the price is near.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "NearMA50")]
    NearMa50,
    #[serde(rename = "NearMA150")]
    NearMa150,
}

impl Condition {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NearMa50 => "Near MA50",
            Self::NearMa150 => "Near MA150",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Candidate Record
// ============================================================================

/// A ticker that passed the proximity filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub ticker: TickerSymbol,
    pub price: f64,
    pub classification: Classification,
    pub condition: Condition,
    pub rvol: f64,
    pub ma50: f64,
    pub ma150: f64,
    pub perf6m: f64,
    /// Percent distance from MA50
    pub distance_ma50: f64,
    /// Percent distance from MA150
    pub distance_ma150: f64,
    /// News and insider context; `None` until enriched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Enrichment>,
}

impl CandidateRecord {
    /// Attach enrichment. Only the first call has an effect.
    pub fn apply_enrichment(&mut self, enrichment: Enrichment) {
        if self.enrichment.is_none() {
            self.enrichment = Some(enrichment);
        }
    }

    /// Enrichment, or the all-unavailable placeholder.
    pub fn enrichment_or_placeholder(&self) -> Enrichment {
        self.enrichment
            .clone()
            .unwrap_or_else(Enrichment::unavailable)
    }
}

/// Outcome of classifying one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted(CandidateRecord),
    Rejected,
}

impl Verdict {
    pub fn accepted(self) -> Option<CandidateRecord> {
        match self {
            Self::Accepted(c) => Some(c),
            Self::Rejected => None,
        }
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Pure proximity filter and classifier.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    proximity_threshold_pct: f64,
    recovery_threshold_pct: f64,
}

impl Classifier {
    pub fn new(config: &ScreenConfig) -> Self {
        Self {
            proximity_threshold_pct: config.proximity_threshold_pct,
            recovery_threshold_pct: config.recovery_threshold_pct,
        }
    }

    /// Accept iff either distance is strictly below the proximity
    /// threshold. MA50 takes priority for the condition label.
    pub fn classify(&self, ticker: &TickerSymbol, snapshot: &SignalSnapshot) -> Verdict {
        let d50 = snapshot.distance_to_ma50();
        let d150 = snapshot.distance_to_ma150();

        let condition = if d50 < self.proximity_threshold_pct {
            Condition::NearMa50
        } else if d150 < self.proximity_threshold_pct {
            Condition::NearMa150
        } else {
            return Verdict::Rejected;
        };

        let classification = if snapshot.perf6m < self.recovery_threshold_pct {
            Classification::Recovery
        } else {
            Classification::Bullish
        };

        Verdict::Accepted(CandidateRecord {
            ticker: ticker.clone(),
            price: snapshot.price,
            classification,
            condition,
            rvol: snapshot.rvol,
            ma50: snapshot.ma50,
            ma150: snapshot.ma150,
            perf6m: snapshot.perf6m,
            distance_ma50: d50,
            distance_ma150: d150,
            enrichment: None,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

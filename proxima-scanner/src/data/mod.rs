//! Market data types and retrieval.
//!
//! Provides the ticker/series value types, the `SeriesProvider` seam for
//! external time-series sources, and the `SeriesFetcher` adapter that turns
//! any provider outcome into either a usable `PriceSeries` or `Unavailable`.
//!
//! # Data Sources
//! - **Yahoo chart API** (default): daily close/volume over 1-2 years

mod fetcher;
mod provider;
mod rate_limiter;
mod yahoo;

pub use fetcher::{FetchOutcome, SeriesFetcher, UnavailableReason};
pub use provider::{ProviderError, SeriesProvider};
pub use rate_limiter::{shared_limiter, RateLimiter, SharedRateLimiter};
pub use yahoo::{YahooChartProvider, DEFAULT_USER_AGENT};

use chrono::NaiveDate;
use proxima_common::{Error, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

// ============================================================================
// Ticker Symbol
// ============================================================================

/// A normalized exchange symbol.
///
/// Normalization trims whitespace, uppercases, and replaces `.` with `-`
/// (share-class notation used by the chart provider, e.g. `BRK.B` → `BRK-B`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickerSymbol(String);

impl TickerSymbol {
    /// Normalize a raw symbol string.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("empty ticker symbol".into()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(Error::InvalidInput(format!(
                "ticker symbol contains whitespace: {:?}",
                trimmed
            )));
        }

        Ok(Self(trimmed.to_uppercase().replace('.', "-")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TickerSymbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for TickerSymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Daily Bars
// ============================================================================

/// One trading day of close and volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
}

impl DailyBar {
    pub fn new(date: NaiveDate, close: f64, volume: f64) -> Self {
        Self {
            date,
            close,
            volume,
        }
    }

    fn is_usable(&self) -> bool {
        self.close.is_finite() && self.close > 0.0 && self.volume.is_finite() && self.volume >= 0.0
    }
}

/// Why a series could not be built.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum SeriesError {
    #[error("insufficient history: {available} bars, need {needed}")]
    InsufficientHistory { needed: usize, available: usize },
}

/// Daily bars for one ticker, ordered oldest to newest.
///
/// A `PriceSeries` always holds at least the minimum bar count it was
/// constructed with.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    symbol: TickerSymbol,
    bars: Vec<DailyBar>,
}

impl PriceSeries {
    /// Build a series, sorting by date and dropping unusable bars.
    ///
    /// Bars with a non-positive or non-finite close, or a negative or
    /// non-finite volume, are discarded before the length check. When the
    /// provider repeats a date the first bar wins.
    pub fn new(
        symbol: TickerSymbol,
        mut bars: Vec<DailyBar>,
        min_bars: usize,
    ) -> std::result::Result<Self, SeriesError> {
        bars.retain(DailyBar::is_usable);
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);

        if bars.len() < min_bars.max(1) {
            return Err(SeriesError::InsufficientHistory {
                needed: min_bars.max(1),
                available: bars.len(),
            });
        }

        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &TickerSymbol {
        &self.symbol
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Latest bar.
    pub fn latest(&self) -> &DailyBar {
        // non-empty by construction
        &self.bars[self.bars.len() - 1]
    }

    /// Close `bars_back` bars before the latest one (0 = latest).
    pub fn close_back(&self, bars_back: usize) -> Option<f64> {
        let idx = self.bars.len().checked_sub(bars_back + 1)?;
        Some(self.bars[idx].close)
    }

    /// Closing prices, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Volumes, oldest first.
    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(n)
    }

    fn sym(s: &str) -> TickerSymbol {
        TickerSymbol::parse(s).unwrap()
    }

    #[test]
    fn test_symbol_normalization() {
        assert_eq!(sym(" brk.b ").as_str(), "BRK-B");
        assert_eq!(sym("aapl").as_str(), "AAPL");
        assert_eq!(sym("BF.B").to_string(), "BF-B");
        assert_eq!("msft".parse::<TickerSymbol>().unwrap(), sym("MSFT"));
    }

    #[test]
    fn test_symbol_rejects_empty_and_spaces() {
        assert!(TickerSymbol::parse("   ").is_err());
        assert!(TickerSymbol::parse("").is_err());
        assert!(TickerSymbol::parse("BRK B").is_err());
    }

    #[test]
    fn test_series_sorts_and_filters() {
        let bars = vec![
            DailyBar::new(day(2), 12.0, 100.0),
            DailyBar::new(day(0), 10.0, 100.0),
            DailyBar::new(day(1), f64::NAN, 100.0),
            DailyBar::new(day(3), 0.0, 100.0),
            DailyBar::new(day(4), 13.0, -1.0),
            DailyBar::new(day(5), 14.0, 0.0),
        ];
        let series = PriceSeries::new(sym("X"), bars, 3).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![10.0, 12.0, 14.0]);
        assert_eq!(series.latest().date, day(5));
        assert_eq!(series.close_back(0), Some(14.0));
        assert_eq!(series.close_back(2), Some(10.0));
        assert_eq!(series.close_back(3), None);
    }

    #[test]
    fn test_series_dedups_dates() {
        let bars = vec![
            DailyBar::new(day(0), 10.0, 1.0),
            DailyBar::new(day(0), 11.0, 1.0),
            DailyBar::new(day(1), 12.0, 1.0),
        ];
        let series = PriceSeries::new(sym("X"), bars, 1).unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_series_insufficient_history() {
        let bars: Vec<_> = (0..150).map(|i| DailyBar::new(day(i), 10.0, 1.0)).collect();
        let err = PriceSeries::new(sym("X"), bars, 151).unwrap_err();
        assert_eq!(
            err,
            SeriesError::InsufficientHistory {
                needed: 151,
                available: 150
            }
        );
    }

    #[test]
    fn test_series_never_empty() {
        let err = PriceSeries::new(sym("X"), Vec::new(), 0).unwrap_err();
        assert!(matches!(err, SeriesError::InsufficientHistory { needed: 1, .. }));
    }
}

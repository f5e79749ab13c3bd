//! Series fetcher adapter.
//!
//! Wraps a `SeriesProvider` with the shared rate limiter, a per-request
//! timeout, and the minimum-history check. Callers only ever see a usable
//! `PriceSeries` or `Unavailable`.

use proxima_common::{FetchConfig, Lookback};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::provider::SeriesProvider;
use super::rate_limiter::SharedRateLimiter;
use super::{PriceSeries, SeriesError, TickerSymbol};

/// Why a ticker produced no series this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The request exceeded the per-request timeout
    Timeout,
    /// The provider failed (network, HTTP status, malformed body)
    ProviderFailed,
    /// Fewer usable bars than the signal engine needs
    InsufficientHistory { needed: usize, available: usize },
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::ProviderFailed => write!(f, "provider failed"),
            Self::InsufficientHistory { needed, available } => {
                write!(f, "insufficient history ({available}/{needed} bars)")
            }
        }
    }
}

/// Result of fetching one ticker.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Series(PriceSeries),
    Unavailable(UnavailableReason),
}

impl FetchOutcome {
    pub fn series(self) -> Option<PriceSeries> {
        match self {
            Self::Series(s) => Some(s),
            Self::Unavailable(_) => None,
        }
    }
}

/// Adapter between the screener and a `SeriesProvider`.
pub struct SeriesFetcher {
    provider: Arc<dyn SeriesProvider>,
    limiter: SharedRateLimiter,
    min_bars: usize,
    timeout: Duration,
}

impl SeriesFetcher {
    pub fn new(
        provider: Arc<dyn SeriesProvider>,
        limiter: SharedRateLimiter,
        min_bars: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            limiter,
            min_bars,
            timeout,
        }
    }

    /// Create from configuration.
    pub fn from_config(
        provider: Arc<dyn SeriesProvider>,
        limiter: SharedRateLimiter,
        config: &FetchConfig,
    ) -> Self {
        Self::new(
            provider,
            limiter,
            config.min_history_bars,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Fetch and validate the daily series for one ticker.
    ///
    /// Never fails: provider errors, timeouts, and short histories all map
    /// to `FetchOutcome::Unavailable`.
    pub async fn fetch(&self, symbol: &TickerSymbol, lookback: Lookback) -> FetchOutcome {
        self.limiter.acquire().await;

        let request = self.provider.daily_bars(symbol, lookback);
        let bars = match tokio::time::timeout(self.timeout, request).await {
            Err(_) => {
                debug!(symbol = %symbol, timeout_secs = self.timeout.as_secs(), "Series fetch timed out");
                return FetchOutcome::Unavailable(UnavailableReason::Timeout);
            }
            Ok(Err(e)) => {
                debug!(
                    symbol = %symbol,
                    provider = self.provider.name(),
                    error = %e,
                    transient = e.is_transient(),
                    "Series fetch failed"
                );
                return FetchOutcome::Unavailable(UnavailableReason::ProviderFailed);
            }
            Ok(Ok(bars)) => bars,
        };

        match PriceSeries::new(symbol.clone(), bars, self.min_bars) {
            Ok(series) => FetchOutcome::Series(series),
            Err(SeriesError::InsufficientHistory { needed, available }) => {
                debug!(symbol = %symbol, needed, available, "Series too short, skipping");
                FetchOutcome::Unavailable(UnavailableReason::InsufficientHistory {
                    needed,
                    available,
                })
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

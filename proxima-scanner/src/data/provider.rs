//! Series provider abstraction.
//!
//! Defines the `SeriesProvider` trait that daily time-series sources
//! implement. Provider errors stay inside the data layer: the fetcher logs
//! them and reports the ticker as unavailable.

use async_trait::async_trait;
use proxima_common::Lookback;
use std::fmt;

use super::{DailyBar, TickerSymbol};

// ============================================================================
// Provider Error
// ============================================================================

/// Errors raised by external data providers.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Network error (connection failed, reset)
    Network(String),
    /// Request exceeded its time budget
    Timeout,
    /// Rate limit exceeded
    RateLimited { retry_after_secs: Option<u64> },
    /// No data for the requested symbol (unknown, delisted)
    DataNotAvailable(String),
    /// Response could not be decoded into the expected shape
    InvalidResponse(String),
    /// Unexpected HTTP status or provider-side failure
    Internal(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Timeout => write!(f, "Request timed out"),
            Self::RateLimited { retry_after_secs } => {
                write!(f, "Rate limited")?;
                if let Some(secs) = retry_after_secs {
                    write!(f, ", retry after {} seconds", secs)?;
                }
                Ok(())
            }
            Self::DataNotAvailable(msg) => write!(f, "Data not available: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Whether a later run could plausibly succeed for the same ticker.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout | Self::RateLimited { .. } | Self::Internal(_)
        )
    }

    /// Map a reqwest failure to a provider error.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Network("Connection failed".into())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Map a non-success HTTP status to a provider error.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status {
            reqwest::StatusCode::TOO_MANY_REQUESTS => Self::RateLimited {
                retry_after_secs: None,
            },
            reqwest::StatusCode::NOT_FOUND => Self::DataNotAvailable(truncate(body, 200)),
            _ => Self::Internal(format!("HTTP {}: {}", status, truncate(body, 200))),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ============================================================================
// Series Provider Trait
// ============================================================================

/// Source of daily close/volume history.
///
/// Implementations handle transport and response shape; they return bars
/// in any order and may include unusable rows; `PriceSeries` cleans them.
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Provider name for logs (e.g., "yahoo")
    fn name(&self) -> &'static str;

    /// Fetch daily bars covering `lookback`.
    async fn daily_bars(
        &self,
        symbol: &TickerSymbol,
        lookback: Lookback,
    ) -> Result<Vec<DailyBar>, ProviderError>;
}

// ============================================================================
// Tests
// ============================================================================

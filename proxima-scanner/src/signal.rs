//! Signal engine.
//!
//! Derives the per-ticker snapshot the classifier works from: trailing
//! simple moving averages, relative volume, and medium-term performance.

use proxima_common::SignalWindows;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::PriceSeries;

/// Signal computation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("series has {available} bars, signal windows need {needed}")]
    InsufficientHistory { needed: usize, available: usize },
}

/// Signals derived from one price series.
///
/// Field names follow the default windows; with custom windows `ma50` is
/// the short average and `ma150` the long one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    /// Latest close
    pub price: f64,
    /// Trailing SMA of closes over the short window
    pub ma50: f64,
    /// Trailing SMA of closes over the long window
    pub ma150: f64,
    /// Trailing mean volume over the volume window
    pub avg_volume20: f64,
    /// Latest volume / avg_volume20, 0 when the average is 0
    pub rvol: f64,
    /// Percent change from the close `perf_lookback` bars back
    pub perf6m: f64,
}

impl SignalSnapshot {
    /// Percent distance between price and the short average.
    pub fn distance_to_ma50(&self) -> f64 {
        distance_pct(self.price, self.ma50)
    }

    /// Percent distance between price and the long average.
    pub fn distance_to_ma150(&self) -> f64 {
        distance_pct(self.price, self.ma150)
    }
}

/// `|price - ma| / ma * 100`.
///
/// A non-positive or non-finite average gives `f64::INFINITY`, which never
/// satisfies a proximity threshold.
pub fn distance_pct(price: f64, ma: f64) -> f64 {
    if !ma.is_finite() || ma <= 0.0 {
        return f64::INFINITY;
    }
    ((price - ma) / ma).abs() * 100.0
}

/// Mean of the last `window` values. Caller guarantees `values.len() >= window > 0`.
fn trailing_mean(values: &[f64], window: usize) -> f64 {
    let tail = &values[values.len() - window..];
    tail.iter().sum::<f64>() / window as f64
}

/// Relative volume with the zero-average guard.
pub fn relative_volume(latest_volume: f64, avg_volume: f64) -> f64 {
    if avg_volume == 0.0 {
        0.0
    } else {
        latest_volume / avg_volume
    }
}

/// Percent change from `reference` to `price`.
pub fn performance_pct(price: f64, reference: f64) -> f64 {
    (price - reference) / reference * 100.0
}

/// Compute the signal snapshot for a series.
///
/// Total for any series at least `windows.required_bars()` long; shorter
/// series return `SignalError::InsufficientHistory` instead of panicking.
pub fn compute_signals(
    series: &PriceSeries,
    windows: &SignalWindows,
) -> Result<SignalSnapshot, SignalError> {
    let needed = windows.required_bars();
    if windows.ma_short == 0 || windows.ma_long == 0 || windows.volume_avg == 0 || series.len() < needed {
        return Err(SignalError::InsufficientHistory {
            needed,
            available: series.len(),
        });
    }

    let closes = series.closes();
    let volumes = series.volumes();

    let latest = series.latest();
    let price = latest.close;

    let ma50 = trailing_mean(&closes, windows.ma_short);
    let ma150 = trailing_mean(&closes, windows.ma_long);
    let avg_volume20 = trailing_mean(&volumes, windows.volume_avg);
    let rvol = relative_volume(latest.volume, avg_volume20);

    // Reference is perf_lookback bars before the latest bar (latest is 0 back).
    // required_bars() covers perf_lookback + 1
    let reference = series
        .close_back(windows.perf_lookback)
        .ok_or(SignalError::InsufficientHistory {
            needed,
            available: series.len(),
        })?;
    let perf6m = performance_pct(price, reference);

    Ok(SignalSnapshot {
        price,
        ma50,
        ma150,
        avg_volume20,
        rvol,
        perf6m,
    })
}

// ============================================================================
// Tests
// ============================================================================

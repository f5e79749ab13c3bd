//! Proxima Scanner Library
//!
//! Batch equity screener. Scans a universe of US-listed tickers once per
//! run and reports those trading close to their 50- or 150-day simple
//! moving average, ranked by relative volume.
//!
//! # Modules
//!
//! - [`universe`]: ticker universe from HTML/CSV constituent lists, with a
//!   backup list when live sources fail
//! - [`data`]: daily series retrieval behind the `SeriesProvider` seam
//! - [`signal`]: moving averages, relative volume, 6-month performance
//! - [`screener`]: proximity filter, ranking, pipeline, and reports
//! - [`enrichment`]: best-effort news and insider context

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod cli;
pub mod data;
pub mod enrichment;
pub mod screener;
pub mod signal;
pub mod universe;

pub use data::{DailyBar, PriceSeries, TickerSymbol};
pub use screener::{ReportFormat, ScanResult, ScreenerEngine, ScreenerReport};
pub use signal::{compute_signals, SignalSnapshot};

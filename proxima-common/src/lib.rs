//! Proxima Common - configuration, errors, and logging shared by the
//! screener crates.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - The shared input error type
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{
    EnrichmentConfig, FetchConfig, Lookback, ObservabilityConfig, OutputConfig, ScanConfig,
    ScannerConfig, ScreenConfig, SignalWindows, SourceKind, UniverseConfig, UniverseSourceConfig,
};
pub use error::{Error, Result};
pub use validation::{Validate, ValidationError};

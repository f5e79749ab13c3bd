//! Configuration validation.
//!
//! Rejects threshold and window combinations the signal engine cannot
//! honour before any network work starts.

use thiserror::Error;

use crate::config::{FetchConfig, ScanConfig, ScannerConfig, ScreenConfig, UniverseConfig};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration conflict: {reason}")]
    Conflict { reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

impl ScannerConfig {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.screen.validate() {
            errors.push(e);
        }
        if let Err(e) = self.universe.validate() {
            errors.push(e);
        }
        if let Err(e) = self.fetch.validate() {
            errors.push(e);
        }
        if let Err(e) = self.scan.validate() {
            errors.push(e);
        }

        let required = self.screen.windows.required_bars();
        if self.fetch.min_history_bars < required {
            errors.push(ValidationError::Conflict {
                reason: format!(
                    "fetch.min_history_bars ({}) is below the {} bars the signal windows need",
                    self.fetch.min_history_bars, required
                ),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }
}

impl Validate for ScreenConfig {
    fn validate(&self) -> ValidationResult<()> {
        if !self.proximity_threshold_pct.is_finite() || self.proximity_threshold_pct <= 0.0 {
            return Err(invalid(
                "screen.proximity_threshold_pct",
                "must be a positive percentage",
            ));
        }
        if !self.recovery_threshold_pct.is_finite() {
            return Err(invalid("screen.recovery_threshold_pct", "must be finite"));
        }

        let w = &self.windows;
        for (field, value) in [
            ("screen.windows.ma_short", w.ma_short),
            ("screen.windows.ma_long", w.ma_long),
            ("screen.windows.volume_avg", w.volume_avg),
            ("screen.windows.perf_lookback", w.perf_lookback),
        ] {
            if value == 0 {
                return Err(invalid(field, "window must be at least one bar"));
            }
        }

        Ok(())
    }
}

impl Validate for UniverseConfig {
    fn validate(&self) -> ValidationResult<()> {
        for source in &self.sources {
            if source.columns.is_empty() {
                return Err(invalid(
                    &format!("universe.sources[{}].columns", source.name),
                    "at least one column name is required",
                ));
            }
            if source.url.trim().is_empty() {
                return Err(invalid(
                    &format!("universe.sources[{}].url", source.name),
                    "url is empty",
                ));
            }
        }
        Ok(())
    }
}

impl Validate for FetchConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.request_timeout_secs == 0 {
            return Err(invalid("fetch.request_timeout_secs", "must be positive"));
        }
        if self.requests_per_minute == 0 {
            return Err(invalid("fetch.requests_per_minute", "must be positive"));
        }
        Ok(())
    }
}

impl Validate for ScanConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.concurrency == 0 {
            return Err(invalid("scan.concurrency", "must be at least 1"));
        }
        if self.run_timeout_secs == Some(0) {
            return Err(invalid("scan.run_timeout_secs", "must be positive when set"));
        }
        Ok(())
    }
}

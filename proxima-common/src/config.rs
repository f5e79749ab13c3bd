//! Configuration management for Proxima.
//!
//! The screener reads a single JSON file at `~/.proxima/config.json`. Every
//! field has a default, so a missing file or a partial file is valid.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (PROXIMA_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `PROXIMA_LOG_LEVEL` → observability.log_level
//! - `PROXIMA_LOG_FORMAT` → observability.log_format
//! - `PROXIMA_PROXIMITY_PCT` → screen.proximity_threshold_pct
//! - `PROXIMA_RECOVERY_PCT` → screen.recovery_threshold_pct
//! - `PROXIMA_CONCURRENCY` → scan.concurrency
//! - `PROXIMA_OUTPUT` → output.path

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".proxima"),
        |dirs| dirs.home_dir().join(".proxima"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Complete screener configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Proximity and classification thresholds
    #[serde(default)]
    pub screen: ScreenConfig,

    /// Ticker universe sources
    #[serde(default)]
    pub universe: UniverseConfig,

    /// Price series retrieval
    #[serde(default)]
    pub fetch: FetchConfig,

    /// News / insider enrichment
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Worker pool and run bounds
    #[serde(default)]
    pub scan: ScanConfig,

    /// Report output
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl ScannerConfig {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Values that fail to parse are ignored and the file value is kept.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("PROXIMA_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("PROXIMA_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Some(pct) = lookup("PROXIMA_PROXIMITY_PCT") {
            if let Ok(v) = pct.parse() {
                self.screen.proximity_threshold_pct = v;
            }
        }
        if let Some(pct) = lookup("PROXIMA_RECOVERY_PCT") {
            if let Ok(v) = pct.parse() {
                self.screen.recovery_threshold_pct = v;
            }
        }
        if let Some(n) = lookup("PROXIMA_CONCURRENCY") {
            if let Ok(v) = n.parse() {
                self.scan.concurrency = v;
            }
        }
        if let Some(path) = lookup("PROXIMA_OUTPUT") {
            self.output.path = path;
        }
    }

    /// One-line summary of the active screening rule, for logs and reports.
    pub fn summary(&self) -> String {
        format!(
            "|price-MA{}| or |price-MA{}| < {}%, recovery < {}%",
            self.screen.windows.ma_short,
            self.screen.windows.ma_long,
            self.screen.proximity_threshold_pct,
            self.screen.recovery_threshold_pct
        )
    }
}

// ============================================================================
// Screen Configuration
// ============================================================================

/// Filter and classification thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenConfig {
    /// Maximum percent distance between price and a moving average
    #[serde(default = "default_proximity_threshold_pct")]
    pub proximity_threshold_pct: f64,

    /// 6-month performance (%) below which a candidate is labelled Recovery
    #[serde(default = "default_recovery_threshold_pct")]
    pub recovery_threshold_pct: f64,

    /// Lookback windows used by the signal engine
    #[serde(default)]
    pub windows: SignalWindows,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_pct: default_proximity_threshold_pct(),
            recovery_threshold_pct: default_recovery_threshold_pct(),
            windows: SignalWindows::default(),
        }
    }
}

fn default_proximity_threshold_pct() -> f64 {
    5.0
}

fn default_recovery_threshold_pct() -> f64 {
    -25.0
}

/// Bar counts for each derived signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalWindows {
    #[serde(default = "default_ma_short")]
    pub ma_short: usize,
    #[serde(default = "default_ma_long")]
    pub ma_long: usize,
    #[serde(default = "default_volume_avg")]
    pub volume_avg: usize,
    /// Bars between the reference close and the latest close for perf6m
    #[serde(default = "default_perf_lookback")]
    pub perf_lookback: usize,
}

impl SignalWindows {
    /// Minimum number of bars a series needs for every signal to be defined.
    pub fn required_bars(&self) -> usize {
        self.ma_short
            .max(self.ma_long)
            .max(self.volume_avg)
            .max(self.perf_lookback + 1)
    }
}

impl Default for SignalWindows {
    fn default() -> Self {
        Self {
            ma_short: default_ma_short(),
            ma_long: default_ma_long(),
            volume_avg: default_volume_avg(),
            perf_lookback: default_perf_lookback(),
        }
    }
}

fn default_ma_short() -> usize {
    50
}

fn default_ma_long() -> usize {
    150
}

fn default_volume_avg() -> usize {
    20
}

fn default_perf_lookback() -> usize {
    126 // ~6 months of trading days
}

// ============================================================================
// Universe Configuration
// ============================================================================

/// Kind of ticker list document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// HTML page containing a constituents table
    Html,
    /// CSV document with a symbol column
    Csv,
}

/// One ticker list source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseSourceConfig {
    pub kind: SourceKind,
    pub name: String,
    pub url: String,
    /// Header names that identify the symbol column, tried in order
    #[serde(default = "default_symbol_columns")]
    pub columns: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Universe resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseConfig {
    /// Sources in the order they are tried
    #[serde(default = "default_universe_sources")]
    pub sources: Vec<UniverseSourceConfig>,

    /// Below this many symbols the live sources are considered failed and
    /// the backup list is used
    #[serde(default = "default_min_universe_size")]
    pub min_universe_size: usize,

    /// Symbols always added to the universe
    #[serde(default)]
    pub extra_symbols: Vec<String>,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            sources: default_universe_sources(),
            min_universe_size: default_min_universe_size(),
            extra_symbols: Vec::new(),
        }
    }
}

fn default_symbol_columns() -> Vec<String> {
    vec!["Symbol".to_string(), "Ticker".to_string()]
}

fn default_universe_sources() -> Vec<UniverseSourceConfig> {
    vec![
        UniverseSourceConfig {
            kind: SourceKind::Html,
            name: "sp500".to_string(),
            url: "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies".to_string(),
            columns: default_symbol_columns(),
            enabled: true,
        },
        UniverseSourceConfig {
            kind: SourceKind::Html,
            name: "nasdaq100".to_string(),
            url: "https://en.wikipedia.org/wiki/Nasdaq-100".to_string(),
            columns: vec!["Ticker".to_string(), "Symbol".to_string()],
            enabled: true,
        },
        UniverseSourceConfig {
            kind: SourceKind::Html,
            name: "dow30".to_string(),
            url: "https://en.wikipedia.org/wiki/Dow_Jones_Industrial_Average".to_string(),
            columns: default_symbol_columns(),
            enabled: true,
        },
        UniverseSourceConfig {
            kind: SourceKind::Csv,
            name: "sp500-csv".to_string(),
            url: "https://raw.githubusercontent.com/datasets/s-and-p-500-companies/main/data/constituents.csv"
                .to_string(),
            columns: default_symbol_columns(),
            enabled: true,
        },
    ]
}

fn default_min_universe_size() -> usize {
    20
}

// ============================================================================
// Fetch Configuration
// ============================================================================

/// Historical window requested from the series provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lookback {
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
}

impl Lookback {
    /// Range parameter understood by chart APIs.
    pub fn as_range(&self) -> &'static str {
        match self {
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
        }
    }
}

impl std::fmt::Display for Lookback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_range())
    }
}

/// Price series retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_lookback")]
    pub lookback: Lookback,

    /// Series shorter than this are skipped
    #[serde(default = "default_min_history_bars")]
    pub min_history_bars: usize,

    /// Per-request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Shared request budget across all workers
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    #[serde(default = "default_chart_base_url")]
    pub chart_base_url: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            lookback: default_lookback(),
            min_history_bars: default_min_history_bars(),
            request_timeout_secs: default_request_timeout_secs(),
            requests_per_minute: default_requests_per_minute(),
            chart_base_url: default_chart_base_url(),
        }
    }
}

fn default_lookback() -> Lookback {
    Lookback::TwoYears
}

fn default_min_history_bars() -> usize {
    151 // max(150, 126) + 1
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_requests_per_minute() -> u32 {
    300
}

fn default_chart_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

// ============================================================================
// Enrichment Configuration
// ============================================================================

/// News and insider lookup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_news_items")]
    pub max_news_items: usize,

    /// Raw insider text longer than this is truncated
    #[serde(default = "default_max_insider_chars")]
    pub max_insider_chars: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_search_base_url")]
    pub search_base_url: String,

    #[serde(default = "default_summary_base_url")]
    pub summary_base_url: String,

    /// Page that hands out the session cookie needed for a summary crumb
    #[serde(default = "default_consent_url")]
    pub consent_url: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_news_items: default_max_news_items(),
            max_insider_chars: default_max_insider_chars(),
            request_timeout_secs: default_request_timeout_secs(),
            search_base_url: default_search_base_url(),
            summary_base_url: default_summary_base_url(),
            consent_url: default_consent_url(),
        }
    }
}

fn default_max_news_items() -> usize {
    2
}

fn default_max_insider_chars() -> usize {
    80
}

fn default_search_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_summary_base_url() -> String {
    "https://query2.finance.yahoo.com".to_string()
}

fn default_consent_url() -> String {
    "https://fc.yahoo.com".to_string()
}

// ============================================================================
// Scan Configuration
// ============================================================================

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Tickers processed in parallel
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Optional bound on the whole run; partial results are still reported
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            run_timeout_secs: None,
        }
    }
}

fn default_concurrency() -> usize {
    4
}

// ============================================================================
// Output Configuration
// ============================================================================

/// Report output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: String,

    /// html, json or markdown
    #[serde(default = "default_output_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            format: default_output_format(),
        }
    }
}

fn default_output_path() -> String {
    "index.html".to_string()
}

fn default_output_format() -> String {
    "html".to_string()
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::default();
        assert!((config.screen.proximity_threshold_pct - 5.0).abs() < f64::EPSILON);
        assert!((config.screen.recovery_threshold_pct + 25.0).abs() < f64::EPSILON);
        assert_eq!(config.fetch.min_history_bars, 151);
        assert_eq!(config.fetch.lookback, Lookback::TwoYears);
        assert_eq!(config.universe.min_universe_size, 20);
        assert_eq!(config.universe.sources.len(), 4);
        assert_eq!(config.enrichment.max_news_items, 2);
        assert_eq!(config.enrichment.consent_url, "https://fc.yahoo.com");
        assert_eq!(config.scan.concurrency, 4);
        assert!(config.scan.run_timeout_secs.is_none());
        assert_eq!(config.output.format, "html");
    }

    #[test]
    fn test_required_bars_matches_history_default() {
        let windows = SignalWindows::default();
        assert_eq!(windows.required_bars(), 150);
        assert!(FetchConfig::default().min_history_bars >= windows.required_bars());

        let wide = SignalWindows {
            perf_lookback: 200,
            ..SignalWindows::default()
        };
        assert_eq!(wide.required_bars(), 201);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "screen": { "proximity_threshold_pct": 10.0 }, "fetch": { "lookback": "1y" } }"#;
        let config: ScannerConfig = serde_json::from_str(json).unwrap();
        assert!((config.screen.proximity_threshold_pct - 10.0).abs() < f64::EPSILON);
        assert!((config.screen.recovery_threshold_pct + 25.0).abs() < f64::EPSILON);
        assert_eq!(config.screen.windows.ma_long, 150);
        assert_eq!(config.fetch.lookback, Lookback::OneYear);
        assert_eq!(config.fetch.requests_per_minute, 300);
    }

    #[test]
    fn test_source_kind_serialization() {
        let json = r#"{ "kind": "csv", "name": "mine", "url": "http://localhost/list.csv" }"#;
        let source: UniverseSourceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(source.kind, SourceKind::Csv);
        assert_eq!(source.columns, vec!["Symbol", "Ticker"]);
        assert!(source.enabled);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "scan": {{ "concurrency": 8, "run_timeout_secs": 600 }}, "observability": {{ "level": "debug" }} }}"#
        )
        .unwrap();

        let config = ScannerConfig::load_from(file.path()).unwrap();
        assert_eq!(config.scan.concurrency, 8);
        assert_eq!(config.scan.run_timeout_secs, Some(600));
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_load_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = ScannerConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PROXIMA_PROXIMITY_PCT", "7.5"),
            ("PROXIMA_CONCURRENCY", "not-a-number"),
            ("PROXIMA_LOG_FORMAT", "json"),
            ("PROXIMA_OUTPUT", "out/report.html"),
        ]
        .into_iter()
        .collect();

        let mut config = ScannerConfig::default();
        config.apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()));

        assert!((config.screen.proximity_threshold_pct - 7.5).abs() < f64::EPSILON);
        assert_eq!(config.scan.concurrency, 4);
        assert_eq!(config.observability.log_format, "json");
        assert_eq!(config.output.path, "out/report.html");
    }

    #[test]
    fn test_config_serialization() {
        let config = ScannerConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("proximity_threshold_pct"));
        assert!(json.contains("\"2y\""));

        let parsed: ScannerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.fetch.min_history_bars, config.fetch.min_history_bars);
        assert_eq!(parsed.universe.sources.len(), config.universe.sources.len());
    }

    #[test]
    fn test_summary_mentions_thresholds() {
        let summary = ScannerConfig::default().summary();
        assert!(summary.contains("MA50"));
        assert!(summary.contains("MA150"));
        assert!(summary.contains("5%"));
    }
}

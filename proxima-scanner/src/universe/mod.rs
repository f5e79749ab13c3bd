//! Universe resolution.
//!
//! Builds the set of tickers to scan from an ordered list of sources.
//! Every source that succeeds contributes its symbols to a union; failed
//! sources are logged and skipped. When the union is smaller than the
//! configured sanity threshold, a hard-coded backup list of major symbols
//! is used instead. `resolve()` never fails and never returns an empty set.

mod csv;
mod html;
mod static_list;

pub use self::csv::{extract_csv_column, CsvSource};
pub use self::html::{extract_table_column, HtmlTableSource};
pub use self::static_list::StaticSource;

use async_trait::async_trait;
use proxima_common::{SourceKind, UniverseConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::{TickerSymbol, DEFAULT_USER_AGENT};

/// Symbols used when live sources yield too little.
///
/// Large, liquid US listings; never empty.
pub const BACKUP_SYMBOLS: &[&str] = &[
    "AAPL", "MSFT", "NVDA", "TSLA", "INTC", "PYPL", "DIS", "BA", "AVGO", "AMD", "META", "GOOGL",
    "AMZN", "NFLX", "JPM", "V", "MA", "UNH", "JNJ", "XOM", "WMT", "PG", "HD", "KO", "PEP",
    "COST", "ORCL", "CRM", "ADBE", "QCOM",
];

// ============================================================================
// Source Trait
// ============================================================================

/// Error from a single universe source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Failed to parse document: {0}")]
    Parse(String),

    #[error("No column named any of {0:?}")]
    ColumnNotFound(Vec<String>),

    #[error("Source returned no symbols")]
    Empty,
}

impl SourceError {
    /// Whether trying again later could succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status(code) => *code == 429 || *code >= 500,
            Self::Parse(_) | Self::ColumnNotFound(_) | Self::Empty => false,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

/// A provider of raw ticker symbols.
#[async_trait]
pub trait UniverseSource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch raw, unnormalized symbol strings.
    async fn fetch_symbols(&self) -> Result<Vec<String>, SourceError>;
}

/// GET a document body as text, mapping non-2xx to `SourceError::Status`.
pub(crate) async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String, SourceError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status(status.as_u16()));
    }
    Ok(response.text().await?)
}

// ============================================================================
// Resolved Universe
// ============================================================================

/// Where the resolved symbols came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UniverseOrigin {
    /// Union of the named sources that succeeded
    Live { sources: Vec<String> },
    /// The hard-coded backup list
    Backup,
    /// Symbols given directly by the caller
    Explicit,
}

impl std::fmt::Display for UniverseOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live { sources } => write!(f, "live ({})", sources.join(", ")),
            Self::Backup => write!(f, "backup list"),
            Self::Explicit => write!(f, "explicit list"),
        }
    }
}

/// Output of universe resolution.
#[derive(Debug, Clone)]
pub struct ResolvedUniverse {
    pub symbols: BTreeSet<TickerSymbol>,
    pub origin: UniverseOrigin,
}

impl ResolvedUniverse {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn is_backup(&self) -> bool {
        self.origin == UniverseOrigin::Backup
    }

    /// Universe from caller-supplied symbols; invalid entries are dropped.
    pub fn explicit<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            symbols: symbols
                .into_iter()
                .filter_map(|s| TickerSymbol::parse(s.as_ref()).ok())
                .collect(),
            origin: UniverseOrigin::Explicit,
        }
    }
}

/// The backup list as a normalized set.
pub fn backup_universe() -> BTreeSet<TickerSymbol> {
    BACKUP_SYMBOLS
        .iter()
        .filter_map(|s| TickerSymbol::parse(s).ok())
        .collect()
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves the scan universe from configured sources.
pub struct UniverseResolver {
    sources: Vec<Box<dyn UniverseSource>>,
    min_size: usize,
}

impl UniverseResolver {
    pub fn new(sources: Vec<Box<dyn UniverseSource>>, min_size: usize) -> Self {
        Self { sources, min_size }
    }

    /// Build sources from configuration.
    ///
    /// `extra_symbols` become a static source registered first; disabled
    /// sources are skipped.
    pub fn from_config(config: &UniverseConfig, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let mut sources: Vec<Box<dyn UniverseSource>> = Vec::new();

        if !config.extra_symbols.is_empty() {
            sources.push(Box::new(StaticSource::new(
                "extra",
                config.extra_symbols.clone(),
            )));
        }

        for source in config.sources.iter().filter(|s| s.enabled) {
            match source.kind {
                SourceKind::Html => sources.push(Box::new(HtmlTableSource::new(
                    source.name.clone(),
                    source.url.clone(),
                    source.columns.clone(),
                    client.clone(),
                ))),
                SourceKind::Csv => sources.push(Box::new(CsvSource::new(
                    source.name.clone(),
                    source.url.clone(),
                    source.columns.clone(),
                    client.clone(),
                ))),
            }
        }

        Self::new(sources, config.min_universe_size)
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Resolve the universe. Never fails; never empty.
    pub async fn resolve(&self) -> ResolvedUniverse {
        let fetches = self.sources.iter().map(|s| s.fetch_symbols());
        let results = futures::future::join_all(fetches).await;

        let mut symbols = BTreeSet::new();
        let mut contributing = Vec::new();

        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(raw) => {
                    let before = symbols.len();
                    let mut invalid = 0usize;
                    for s in &raw {
                        match TickerSymbol::parse(s) {
                            Ok(symbol) => {
                                symbols.insert(symbol);
                            }
                            Err(_) => invalid += 1,
                        }
                    }
                    debug!(
                        source = source.name(),
                        raw = raw.len(),
                        new = symbols.len() - before,
                        invalid,
                        "Universe source resolved"
                    );
                    contributing.push(source.name().to_string());
                }
                Err(e) => {
                    warn!(
                        source = source.name(),
                        error = %e,
                        recoverable = e.is_recoverable(),
                        "Universe source failed"
                    );
                }
            }
        }

        if symbols.len() < self.min_size.max(1) {
            warn!(
                resolved = symbols.len(),
                min_size = self.min_size,
                backup = BACKUP_SYMBOLS.len(),
                "Universe below sanity threshold, using backup list"
            );
            return ResolvedUniverse {
                symbols: backup_universe(),
                origin: UniverseOrigin::Backup,
            };
        }

        info!(
            symbols = symbols.len(),
            sources = contributing.len(),
            "Universe resolved"
        );

        ResolvedUniverse {
            symbols,
            origin: UniverseOrigin::Live {
                sources: contributing,
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

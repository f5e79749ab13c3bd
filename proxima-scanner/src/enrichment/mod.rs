//! Best-effort enrichment of accepted candidates.
//!
//! Each accepted ticker gets recent news links and a summary of the most
//! recent insider transaction. Lookups never fail the candidate: any error
//! becomes an explicit `Unavailable` value that the report renders as a
//! fixed placeholder.

mod yahoo;

pub use yahoo::YahooEnrichmentProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::data::{ProviderError, SharedRateLimiter, TickerSymbol};

/// Placeholder rendered when news could not be fetched.
pub const NO_NEWS: &str = "No News";
/// Placeholder rendered when insider data could not be fetched.
pub const NO_INSIDER_DATA: &str = "No Data";
/// Rendered when the lookup succeeded but reported no transactions.
pub const NO_RECENT_INSIDER: &str = "No Recent Data";

// ============================================================================
// Enrichment Values
// ============================================================================

/// A news headline with its link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
}

/// News attached to a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "items", rename_all = "snake_case")]
pub enum NewsRef {
    Items(Vec<NewsItem>),
    Unavailable,
}

impl NewsRef {
    /// Items to render; empty for `Unavailable` or an empty list.
    pub fn items(&self) -> &[NewsItem] {
        match self {
            Self::Items(items) => items,
            Self::Unavailable => &[],
        }
    }
}

/// Summary of the most recent insider transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum InsiderSummary {
    Buy,
    Sell,
    /// Unclassified transaction text, possibly truncated
    Raw(String),
    NoRecentActivity,
    Unavailable,
}

impl InsiderSummary {
    /// Apply the keyword rule table to a transaction description.
    ///
    /// Matching is case-sensitive substring containment. Purchase keywords
    /// are checked before sale keywords.
    pub fn classify(text: &str, max_chars: usize) -> Self {
        const BUY_KEYWORDS: &[&str] = &["Purchase", "Buy"];
        const SELL_KEYWORDS: &[&str] = &["Sale", "Sell"];

        if BUY_KEYWORDS.iter().any(|k| text.contains(k)) {
            Self::Buy
        } else if SELL_KEYWORDS.iter().any(|k| text.contains(k)) {
            Self::Sell
        } else {
            Self::Raw(truncate_chars(text.trim(), max_chars))
        }
    }

    /// Display label for reports.
    pub fn label(&self) -> &str {
        match self {
            Self::Buy => "Buy",
            Self::Sell => "Sell",
            Self::Raw(text) => text,
            Self::NoRecentActivity => NO_RECENT_INSIDER,
            Self::Unavailable => NO_INSIDER_DATA,
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

/// Context attached to an accepted candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub news: NewsRef,
    pub insider: InsiderSummary,
}

impl Enrichment {
    /// Both fields unavailable.
    pub fn unavailable() -> Self {
        Self {
            news: NewsRef::Unavailable,
            insider: InsiderSummary::Unavailable,
        }
    }
}

// ============================================================================
// Enrichment Provider Trait
// ============================================================================

/// Source of per-ticker news and insider activity.
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Up to `limit` recent news items, newest first.
    async fn recent_news(
        &self,
        symbol: &TickerSymbol,
        limit: usize,
    ) -> Result<Vec<NewsItem>, ProviderError>;

    /// Recent insider transaction descriptions, newest first.
    async fn insider_transactions(&self, symbol: &TickerSymbol) -> Result<Vec<String>, ProviderError>;
}

// ============================================================================
// Enricher
// ============================================================================

/// Best-effort enrichment adapter.
pub struct Enricher {
    provider: Option<Arc<dyn EnrichmentProvider>>,
    limiter: SharedRateLimiter,
    timeout: Duration,
    max_news_items: usize,
    max_insider_chars: usize,
}

impl Enricher {
    pub fn new(
        provider: Arc<dyn EnrichmentProvider>,
        limiter: SharedRateLimiter,
        config: &proxima_common::EnrichmentConfig,
    ) -> Self {
        Self {
            provider: Some(provider),
            limiter,
            timeout: Duration::from_secs(config.request_timeout_secs),
            max_news_items: config.max_news_items,
            max_insider_chars: config.max_insider_chars,
        }
    }

    /// An enricher that performs no lookups.
    pub fn disabled(limiter: SharedRateLimiter) -> Self {
        Self {
            provider: None,
            limiter,
            timeout: Duration::from_secs(1),
            max_news_items: 0,
            max_insider_chars: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Look up news and insider context. Never fails.
    pub async fn enrich(&self, symbol: &TickerSymbol) -> Enrichment {
        let Some(provider) = &self.provider else {
            return Enrichment::unavailable();
        };

        self.limiter.acquire().await;
        let news = match tokio::time::timeout(
            self.timeout,
            provider.recent_news(symbol, self.max_news_items),
        )
        .await
        {
            Ok(Ok(mut items)) => {
                items.truncate(self.max_news_items);
                NewsRef::Items(items)
            }
            Ok(Err(e)) => {
                debug!(symbol = %symbol, error = %e, "News lookup failed");
                NewsRef::Unavailable
            }
            Err(_) => {
                debug!(symbol = %symbol, "News lookup timed out");
                NewsRef::Unavailable
            }
        };

        self.limiter.acquire().await;
        let insider = match tokio::time::timeout(self.timeout, provider.insider_transactions(symbol)).await
        {
            Ok(Ok(texts)) => match texts.first() {
                Some(text) => InsiderSummary::classify(text, self.max_insider_chars),
                None => InsiderSummary::NoRecentActivity,
            },
            Ok(Err(e)) => {
                debug!(symbol = %symbol, error = %e, "Insider lookup failed");
                InsiderSummary::Unavailable
            }
            Err(_) => {
                debug!(symbol = %symbol, "Insider lookup timed out");
                InsiderSummary::Unavailable
            }
        };

        Enrichment { news, insider }
    }
}

// ============================================================================
// Tests
// ============================================================================

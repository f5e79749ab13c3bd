//! Yahoo Finance news and insider adapter.
//!
//! # Endpoints
//! - News: `GET {search}/v1/finance/search?q={symbol}&newsCount=N&quotesCount=0`
//! - Insider: `GET {summary}/v10/finance/quoteSummary/{symbol}?modules=insiderTransactions&crumb=C`
//!
//! The summary endpoint answers 401 "Invalid Crumb" unless the request
//! carries a session cookie and its matching crumb. The cookie comes from
//! the consent page, the crumb from `GET {summary}/v1/test/getcrumb`; both
//! are fetched on first use and reused until the endpoint rejects them.

use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{EnrichmentProvider, NewsItem};
use crate::data::{ProviderError, TickerSymbol, DEFAULT_USER_AGENT};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<SearchNews>,
}

#[derive(Debug, Deserialize)]
struct SearchNews {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    quote_summary: SummaryBody,
}

#[derive(Debug, Deserialize)]
struct SummaryBody {
    #[serde(default)]
    result: Option<Vec<SummaryResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    #[serde(default)]
    insider_transactions: Option<InsiderTransactions>,
}

#[derive(Debug, Deserialize)]
struct InsiderTransactions {
    #[serde(default)]
    transactions: Vec<InsiderTransaction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsiderTransaction {
    #[serde(default)]
    transaction_text: Option<String>,
}

/// Cookie and crumb pair authorizing summary requests.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CrumbSession {
    cookie: String,
    crumb: String,
}

/// News and insider lookups against Yahoo Finance.
pub struct YahooEnrichmentProvider {
    client: reqwest::Client,
    search_base_url: String,
    summary_base_url: String,
    consent_url: String,
    session: Mutex<Option<CrumbSession>>,
}

impl YahooEnrichmentProvider {
    pub fn new(
        search_base_url: impl Into<String>,
        summary_base_url: impl Into<String>,
        consent_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            search_base_url: search_base_url.into().trim_end_matches('/').to_string(),
            summary_base_url: summary_base_url.into().trim_end_matches('/').to_string(),
            consent_url: consent_url.into(),
            session: Mutex::new(None),
        }
    }

    /// Create from configuration.
    pub fn from_config(config: &proxima_common::EnrichmentConfig) -> Self {
        Self::new(
            config.search_base_url.clone(),
            config.summary_base_url.clone(),
            config.consent_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Current session, performing the handshake if there is none.
    ///
    /// The lock is held across the handshake so concurrent workers share a
    /// single cookie/crumb fetch.
    async fn session(&self) -> Result<CrumbSession, ProviderError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let session = self.handshake().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn invalidate_session(&self) {
        self.session.lock().await.take();
    }

    async fn handshake(&self) -> Result<CrumbSession, ProviderError> {
        // The consent page usually answers 404; only its cookies matter.
        let response = self
            .client
            .get(&self.consent_url)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .map(str::trim)
            .filter(|pair| pair.contains('='))
            .collect::<Vec<_>>()
            .join("; ");

        if cookie.is_empty() {
            return Err(ProviderError::Internal(format!(
                "no session cookie from {}",
                self.consent_url
            )));
        }

        let url = format!("{}/v1/test/getcrumb", self.summary_base_url);
        let response = self
            .client
            .get(&url)
            .header(COOKIE, &cookie)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.map_err(ProviderError::from_reqwest)?;
        if !status.is_success() {
            return Err(ProviderError::from_status(status, &body));
        }

        let crumb = body.trim();
        if crumb.is_empty() || crumb.contains(char::is_whitespace) || crumb.starts_with('{') {
            return Err(ProviderError::InvalidResponse(format!(
                "unexpected crumb body: {:?}",
                crumb.chars().take(40).collect::<String>()
            )));
        }

        debug!("Obtained summary crumb");
        Ok(CrumbSession {
            cookie,
            crumb: crumb.to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ProviderError> {
        let response = request
            .header("accept", "application/json")
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl EnrichmentProvider for YahooEnrichmentProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn recent_news(
        &self,
        symbol: &TickerSymbol,
        limit: usize,
    ) -> Result<Vec<NewsItem>, ProviderError> {
        let url = format!("{}/v1/finance/search", self.search_base_url);
        debug!(symbol = %symbol, "Fetching news");

        let count = limit.to_string();
        let response: SearchResponse = self
            .get_json(self.client.get(&url).query(&[
                ("q", symbol.as_str()),
                ("newsCount", count.as_str()),
                ("quotesCount", "0"),
            ]))
            .await?;

        Ok(response
            .news
            .into_iter()
            .filter_map(|n| {
                let link = n.link.filter(|l| !l.trim().is_empty())?;
                Some(NewsItem {
                    title: n.title.unwrap_or_else(|| "News".to_string()),
                    link,
                })
            })
            .take(limit)
            .collect())
    }

    async fn insider_transactions(&self, symbol: &TickerSymbol) -> Result<Vec<String>, ProviderError> {
        let session = self.session().await?;
        let url = format!(
            "{}/v10/finance/quoteSummary/{}",
            self.summary_base_url, symbol
        );
        debug!(symbol = %symbol, "Fetching insider transactions");

        let request = self
            .client
            .get(&url)
            .header(COOKIE, &session.cookie)
            .query(&[
                ("modules", "insiderTransactions"),
                ("crumb", session.crumb.as_str()),
            ]);

        let response: SummaryResponse = match self.get_json(request).await {
            Ok(response) => response,
            Err(e) => {
                if matches!(&e, ProviderError::Internal(m) if m.starts_with("HTTP 401")) {
                    warn!(symbol = %symbol, "Summary crumb rejected, renewing on next request");
                    self.invalidate_session().await;
                }
                return Err(e);
            }
        };

        if let Some(err) = response.quote_summary.error.filter(|e| !e.is_null()) {
            return Err(ProviderError::DataNotAvailable(err.to_string()));
        }

        let transactions = response
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .and_then(|r| r.insider_transactions)
            .map(|t| t.transactions)
            .unwrap_or_default();

        Ok(transactions
            .into_iter()
            .map(|t| {
                t.transaction_text
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| "Transaction Reported".to_string())
            })
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SESSION_COOKIE: &str = "A3=d=AQABBKx; Expires=Sat, 19 Oct 2027 00:00:00 GMT; Path=/; Domain=.yahoo.com; Secure; HttpOnly";

    fn provider(server: &MockServer) -> YahooEnrichmentProvider {
        YahooEnrichmentProvider::new(
            server.uri(),
            server.uri(),
            format!("{}/consent", server.uri()),
            Duration::from_secs(5),
        )
    }

    fn aapl() -> TickerSymbol {
        TickerSymbol::parse("AAPL").unwrap()
    }

    async fn mount_handshake(server: &MockServer, expected: u64) {
        Mock::given(method("GET"))
            .and(path("/consent"))
            .respond_with(ResponseTemplate::new(404).insert_header("set-cookie", SESSION_COOKIE))
            .expect(expected)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/test/getcrumb"))
            .and(header("cookie", "A3=d=AQABBKx"))
            .respond_with(ResponseTemplate::new(200).set_body_string("k9Xq/7dLm2a"))
            .expect(expected)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_recent_news() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/finance/search"))
            .and(query_param("q", "AAPL"))
            .and(query_param("newsCount", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"news":[
                    {"title":"Apple beats","link":"https://example.com/a"},
                    {"title":"No link"},
                    {"link":"https://example.com/b"}
                ]}"#,
            ))
            .mount(&server)
            .await;

        let news = provider(&server).recent_news(&aapl(), 2).await.unwrap();
        assert_eq!(news.len(), 2);
        assert_eq!(news[0].title, "Apple beats");
        assert_eq!(news[1].title, "News");
        assert_eq!(news[1].link, "https://example.com/b");
    }

    #[tokio::test]
    async fn test_insider_transactions_send_cookie_and_crumb() {
        let server = MockServer::start().await;
        mount_handshake(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/v10/finance/quoteSummary/AAPL"))
            .and(query_param("modules", "insiderTransactions"))
            .and(query_param("crumb", "k9Xq/7dLm2a"))
            .and(header("cookie", "A3=d=AQABBKx"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"quoteSummary":{"result":[{"insiderTransactions":{"transactions":[
                    {"transactionText":"Sale at price 189.00 per share.","filerName":"COOK TIMOTHY D"},
                    {"transactionText":""}
                ]}}],"error":null}}"#,
            ))
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider(&server);
        let texts = provider.insider_transactions(&aapl()).await.unwrap();
        assert_eq!(texts, vec!["Sale at price 189.00 per share.", "Transaction Reported"]);

        // second lookup reuses the session
        assert_eq!(provider.insider_transactions(&aapl()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_crumb_renews_session() {
        let server = MockServer::start().await;
        mount_handshake(&server, 2).await;
        Mock::given(method("GET"))
            .and(path("/v10/finance/quoteSummary/AAPL"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Crumb"))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let err = provider.insider_transactions(&aapl()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Internal(ref m) if m.contains("401")));

        assert!(provider.insider_transactions(&aapl()).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_cookie_fails_handshake() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/consent"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v10/finance/quoteSummary/AAPL"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = provider(&server)
            .insider_transactions(&aapl())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Internal(ref m) if m.contains("session cookie")));
    }
}

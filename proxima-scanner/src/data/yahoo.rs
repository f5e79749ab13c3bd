//! Yahoo Finance chart API adapter.
//!
//! # Endpoint
//! `GET {base}/v8/finance/chart/{symbol}?range=2y&interval=1d`
//!
//! The response carries parallel arrays (`timestamp[]` and
//! `indicators.quote[0].close[] / volume[]`) with `null` holes on halted
//! days. [`normalize_chart`] flattens them into `DailyBar`s so nothing
//! downstream sees the nested shape.

use async_trait::async_trait;
use chrono::DateTime;
use proxima_common::Lookback;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::provider::{ProviderError, SeriesProvider};
use super::{DailyBar, TickerSymbol};

/// Chart endpoint path prefix
const CHART_ENDPOINT: &str = "/v8/finance/chart";

/// The chart API rejects requests without a browser-like agent.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Flatten a chart response into daily bars.
///
/// Rows with a null close or volume are dropped.
pub(crate) fn normalize_chart(response: ChartResponse) -> Result<Vec<DailyBar>, ProviderError> {
    if let Some(err) = response.chart.error {
        return Err(ProviderError::DataNotAvailable(format!(
            "{}: {}",
            err.code.unwrap_or_else(|| "error".into()),
            err.description.unwrap_or_default()
        )));
    }

    let result = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ProviderError::DataNotAvailable("empty chart result".into()))?;

    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("missing quote indicators".into()))?;

    let bars = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let close = quote.close.get(i).copied().flatten()?;
            let volume = quote.volume.get(i).copied().flatten()?;
            let date = DateTime::from_timestamp(*ts, 0)?.date_naive();
            Some(DailyBar::new(date, close, volume))
        })
        .collect();

    Ok(bars)
}

// ============================================================================
// Yahoo Chart Provider
// ============================================================================

/// Daily series from the Yahoo Finance chart API.
pub struct YahooChartProvider {
    client: reqwest::Client,
    base_url: String,
}

impl YahooChartProvider {
    /// Create a provider against `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self::with_client(client, base_url)
    }

    /// Create a provider sharing an existing client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create from configuration.
    pub fn from_config(config: &proxima_common::FetchConfig) -> Self {
        Self::new(
            config.chart_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

#[async_trait]
impl SeriesProvider for YahooChartProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn daily_bars(
        &self,
        symbol: &TickerSymbol,
        lookback: Lookback,
    ) -> Result<Vec<DailyBar>, ProviderError> {
        let url = format!("{}{}/{}", self.base_url, CHART_ENDPOINT, symbol);

        debug!(url = %url, symbol = %symbol, range = lookback.as_range(), "Fetching chart");

        let response = self
            .client
            .get(&url)
            .query(&[("range", lookback.as_range()), ("interval", "1d")])
            .header("accept", "application/json")
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &body));
        }

        let chart: ChartResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse chart: {}", e)))?;

        normalize_chart(chart)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "symbol": "AAPL", "currency": "USD" },
                "timestamp": [1704205800, 1704292200, 1704378600, 1704465000],
                "indicators": {
                    "quote": [{
                        "open": [187.1, 184.2, 182.1, 181.9],
                        "close": [185.64, null, 181.91, 181.18],
                        "volume": [82488700, 58414500, null, 62303300]
                    }],
                    "adjclose": [{ "adjclose": [185.0, 183.5, 181.5, 180.9] }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_normalize_drops_null_rows() {
        let response: ChartResponse = serde_json::from_str(SAMPLE).unwrap();
        let bars = normalize_chart(response).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!((bars[0].close - 185.64).abs() < 1e-9);
        assert!((bars[0].volume - 82_488_700.0).abs() < 1e-3);
        assert!((bars[1].close - 181.18).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_error_body() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let response: ChartResponse = serde_json::from_str(json).unwrap();
        let err = normalize_chart(response).unwrap_err();
        assert!(matches!(err, ProviderError::DataNotAvailable(ref m) if m.contains("delisted")));
    }

    #[test]
    fn test_normalize_missing_quote() {
        let json = r#"{"chart":{"result":[{"timestamp":[1],"indicators":{"quote":[]}}],"error":null}}"#;
        let response: ChartResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            normalize_chart(response),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_daily_bars_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/BRK-B"))
            .and(query_param("range", "2y"))
            .and(query_param("interval", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE))
            .mount(&server)
            .await;

        let provider = YahooChartProvider::new(server.uri(), Duration::from_secs(5));
        let symbol = TickerSymbol::parse("brk.b").unwrap();
        let bars = provider
            .daily_bars(&symbol, Lookback::TwoYears)
            .await
            .unwrap();
        assert_eq!(bars.len(), 2);
    }

    #[tokio::test]
    async fn test_daily_bars_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("{}"))
            .mount(&server)
            .await;

        let provider = YahooChartProvider::new(server.uri(), Duration::from_secs(5));
        let symbol = TickerSymbol::parse("ZZZZ").unwrap();
        let err = provider
            .daily_bars(&symbol, Lookback::OneYear)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::DataNotAvailable(_)));
    }

    #[tokio::test]
    async fn test_daily_bars_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let provider = YahooChartProvider::new(server.uri(), Duration::from_secs(5));
        let symbol = TickerSymbol::parse("AAPL").unwrap();
        let err = provider
            .daily_bars(&symbol, Lookback::TwoYears)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));
    }
}

//! HTML constituents table source.
//!
//! Index membership pages list constituents in a `<table>` whose header
//! row has a `Symbol` or `Ticker` column. The first table with a matching
//! header wins.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{fetch_text, SourceError, UniverseSource};

/// Ticker list scraped from an HTML table.
pub struct HtmlTableSource {
    name: String,
    url: String,
    columns: Vec<String>,
    client: reqwest::Client,
}

impl HtmlTableSource {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        columns: Vec<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            columns,
            client,
        }
    }
}

#[async_trait]
impl UniverseSource for HtmlTableSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_symbols(&self) -> Result<Vec<String>, SourceError> {
        debug!(source = %self.name, url = %self.url, "Fetching constituents page");
        let body = fetch_text(&self.client, &self.url).await?;
        extract_table_column(&body, &self.columns)
    }
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Parse(format!("selector {css}: {e:?}")))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Read the values of the first column whose header matches one of
/// `columns` (case-insensitive) from the first table that has one.
pub fn extract_table_column(html: &str, columns: &[String]) -> Result<Vec<String>, SourceError> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;

    for table in document.select(&table_sel) {
        let mut rows = table.select(&row_sel);
        let Some(header) = rows.next() else {
            continue;
        };

        let headers: Vec<String> = header.select(&cell_sel).map(cell_text).collect();
        let index = columns.iter().find_map(|wanted| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(wanted))
        });
        let Some(index) = index else {
            continue;
        };

        let symbols: Vec<String> = rows
            .filter_map(|row| row.select(&cell_sel).nth(index))
            .map(cell_text)
            .filter(|s| !s.is_empty())
            .collect();

        if symbols.is_empty() {
            return Err(SourceError::Empty);
        }
        return Ok(symbols);
    }

    Err(SourceError::ColumnNotFound(columns.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"
        <html><body>
          <table class="infobox"><tr><th>Founded</th><td>1957</td></tr></table>
          <table class="wikitable" id="constituents">
            <tbody>
              <tr><th>Symbol</th><th>Security</th><th>GICS Sector</th></tr>
              <tr><td><a href="/q/MMM">MMM</a></td><td>3M</td><td>Industrials</td></tr>
              <tr><td>BRK.B</td><td>Berkshire Hathaway</td><td>Financials</td></tr>
              <tr><td> AAPL </td><td>Apple Inc.</td><td>Information Technology</td></tr>
            </tbody>
          </table>
        </body></html>
    "#;

    fn columns() -> Vec<String> {
        vec!["Symbol".into(), "Ticker".into()]
    }

    #[test]
    fn test_extract_symbol_column() {
        let symbols = extract_table_column(PAGE, &columns()).unwrap();
        assert_eq!(symbols, vec!["MMM", "BRK.B", "AAPL"]);
    }

    #[test]
    fn test_ticker_column_not_first() {
        let html = r#"<table>
            <tr><th>Company</th><th>ticker</th></tr>
            <tr><td>Microsoft</td><td>MSFT</td></tr>
            <tr><td>Nvidia</td><td>NVDA</td></tr>
        </table>"#;
        let symbols = extract_table_column(html, &columns()).unwrap();
        assert_eq!(symbols, vec!["MSFT", "NVDA"]);
    }

    #[test]
    fn test_no_matching_table() {
        let html = "<table><tr><th>Name</th></tr><tr><td>x</td></tr></table>";
        assert!(matches!(
            extract_table_column(html, &columns()),
            Err(SourceError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_header_only_table_is_empty() {
        let html = "<table><tr><th>Symbol</th></tr></table>";
        assert!(matches!(
            extract_table_column(html, &columns()),
            Err(SourceError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_fetch_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/sp500"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let source = HtmlTableSource::new(
            "sp500",
            format!("{}/wiki/sp500", server.uri()),
            columns(),
            reqwest::Client::new(),
        );
        assert_eq!(source.fetch_symbols().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HtmlTableSource::new("sp500", server.uri(), columns(), reqwest::Client::new());
        assert!(matches!(
            source.fetch_symbols().await,
            Err(SourceError::Status(503))
        ));
    }
}

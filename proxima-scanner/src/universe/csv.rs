//! CSV constituents source.

use async_trait::async_trait;
use tracing::debug;

use super::{fetch_text, SourceError, UniverseSource};

/// Ticker list read from a CSV document with a header row.
pub struct CsvSource {
    name: String,
    url: String,
    columns: Vec<String>,
    client: reqwest::Client,
}

impl CsvSource {
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
impl UniverseSource for CsvSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_symbols(&self) -> Result<Vec<String>, SourceError> {
        debug!(source = %self.name, url = %self.url, "Fetching constituents CSV");
        let body = fetch_text(&self.client, &self.url).await?;
        extract_csv_column(&body, &self.columns)
    }
}

/// Read the first column whose header matches one of `columns`
/// (case-insensitive). Malformed rows are skipped.
pub fn extract_csv_column(data: &str, columns: &[String]) -> Result<Vec<String>, SourceError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_reader(data.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SourceError::Parse(e.to_string()))?
        .clone();

    let index = columns
        .iter()
        .find_map(|wanted| headers.iter().position(|h| h.eq_ignore_ascii_case(wanted)))
        .ok_or_else(|| SourceError::ColumnNotFound(columns.to_vec()))?;

    let symbols: Vec<String> = reader
        .records()
        .filter_map(|record| record.ok())
        .filter_map(|record| record.get(index).map(str::to_string))
        .filter(|s| !s.is_empty())
        .collect();

    if symbols.is_empty() {
        return Err(SourceError::Empty);
    }
    Ok(symbols)
}

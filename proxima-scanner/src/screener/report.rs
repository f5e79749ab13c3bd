//! Report generation for scan results.
//!
//! Generates reports in various formats:
//! - HTML (static page, the default artifact)
//! - JSON (for programmatic use)
//! - Markdown (for terminal and CI logs)

use anyhow::{Context, Result};
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::aggregator::ScanResult;
use super::classifier::CandidateRecord;
use crate::enrichment::NO_NEWS;

/// Body text when nothing matched.
pub const NO_MATCHES_MESSAGE: &str = "No matches today.";

// ============================================================================
// Report Format
// ============================================================================

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Static HTML page
    #[default]
    Html,
    /// JSON format (machine-readable)
    Json,
    /// Markdown format (human-readable)
    Markdown,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Html => write!(f, "html"),
            Self::Json => write!(f, "json"),
            Self::Markdown => write!(f, "markdown"),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" | "htm" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

// ============================================================================
// Screener Report
// ============================================================================

/// Report generator for scan results.
pub struct ScreenerReport {
    result: ScanResult,
}

impl ScreenerReport {
    pub fn new(result: ScanResult) -> Self {
        Self { result }
    }

    /// Generate report in the specified format.
    pub fn generate(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Html => self.to_html(),
            ReportFormat::Json => self.to_json(),
            ReportFormat::Markdown => self.to_markdown(),
        }
    }

    /// Save report to file, adding the format's extension when the path
    /// has none.
    pub fn save_to_file(&self, path: &Path, format: ReportFormat) -> Result<PathBuf> {
        let content = self.generate(format);

        let file_path = if path.extension().is_none() {
            path.with_extension(format.extension())
        } else {
            path.to_path_buf()
        };

        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create report directory")?;
        }

        std::fs::write(&file_path, content)
            .with_context(|| format!("Failed to write report file {}", file_path.display()))?;

        Ok(file_path)
    }

    /// Static HTML page.
    pub fn to_html(&self) -> String {
        let r = &self.result;
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str("<title>Proxima Screener</title>\n");
        html.push_str(STYLE);
        html.push_str("</head>\n<body>\n");

        if r.is_empty() {
            let _ = writeln!(html, "<h1>{}</h1>", NO_MATCHES_MESSAGE);
            let _ = writeln!(
                html,
                "<p class=\"meta\">Scanned {} tickers | Generated {}</p>",
                r.stats.scanned,
                r.completed_at.format("%Y-%m-%d %H:%M")
            );
            html.push_str("</body>\n</html>\n");
            return html;
        }

        html.push_str("<h1>Moving-Average Proximity Scan</h1>\n");
        let _ = writeln!(
            html,
            "<p class=\"meta\">Scanned {} tickers | {} matches | Generated {}</p>",
            r.stats.scanned,
            r.len(),
            r.completed_at.format("%Y-%m-%d %H:%M")
        );
        let _ = writeln!(
            html,
            "<p class=\"meta\">Criteria: {} | Universe: {}</p>",
            encode_text(&r.config_summary),
            encode_text(&r.universe_origin.to_string())
        );
        if r.timed_out {
            html.push_str("<p class=\"warn\">Run timed out; results are partial.</p>\n");
        }

        html.push_str("<table>\n<thead><tr>");
        for col in ["Ticker", "Price", "Type", "Condition", "RVOL", "Insider", "Latest News"] {
            let _ = write!(html, "<th>{}</th>", col);
        }
        html.push_str("</tr></thead>\n<tbody>\n");

        for c in &r.candidates {
            html.push_str(&html_row(c));
        }

        html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
        html
    }

    /// Generate JSON report.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.result).unwrap_or_else(|_| "{}".to_string())
    }

    /// Generate markdown report.
    pub fn to_markdown(&self) -> String {
        let r = &self.result;
        let mut md = String::new();

        let _ = write!(
            md,
            "# Proximity Scan Report\n\n**Scan ID**: {}\n**Time**: {}\n**Duration**: {:.1}s\n\n",
            r.id,
            r.completed_at.format("%Y-%m-%d %H:%M:%S"),
            r.duration_secs
        );

        md.push_str("## Summary\n\n");
        let _ = writeln!(md, "- **Universe**: {} tickers ({})", r.stats.universe_size, r.universe_origin);
        let _ = writeln!(md, "- **Scanned**: {}", r.stats.scanned);
        let _ = writeln!(md, "- **Unavailable**: {}", r.stats.unavailable);
        let _ = writeln!(md, "- **Rejected**: {}", r.stats.rejected);
        let _ = writeln!(md, "- **Matched**: {}", r.len());
        let _ = writeln!(md, "- **Criteria**: {}", r.config_summary);
        if r.timed_out {
            md.push_str("- **Note**: run timed out, results are partial\n");
        }
        md.push('\n');

        if r.is_empty() {
            let _ = writeln!(md, "{}", NO_MATCHES_MESSAGE);
            return md;
        }

        md.push_str("| Ticker | Price | Type | Condition | RVOL | 6M % | Insider | News |\n");
        md.push_str("|--------|-------|------|-----------|------|------|---------|------|\n");
        for c in &r.candidates {
            let enrichment = c.enrichment_or_placeholder();
            let news = enrichment.news.items();
            let news = if news.is_empty() {
                NO_NEWS.to_string()
            } else {
                news.iter()
                    .map(|n| format!("[{}]({})", n.title.replace('|', "/"), n.link))
                    .collect::<Vec<_>>()
                    .join("<br>")
            };
            let _ = writeln!(
                md,
                "| {} | {:.2}$ | {} | {} | {:.2} | {:.1} | {} | {} |",
                c.ticker,
                c.price,
                c.classification,
                c.condition,
                c.rvol,
                c.perf6m,
                enrichment.insider.label().replace('|', "/"),
                news
            );
        }

        md
    }
}

const STYLE: &str = "<style>\n\
body { font-family: -apple-system, Segoe UI, sans-serif; margin: 2em; }\n\
table { border-collapse: collapse; width: 100%; }\n\
th, td { border: 1px solid #ddd; padding: 6px 10px; text-align: left; }\n\
th { background: #f4f4f4; }\n\
.meta { color: #666; }\n\
.warn { color: #b35900; }\n\
</style>\n";

fn html_row(c: &CandidateRecord) -> String {
    let enrichment = c.enrichment_or_placeholder();

    let items = enrichment.news.items();
    let news = if items.is_empty() {
        encode_text(NO_NEWS).into_owned()
    } else {
        items
            .iter()
            .map(|n| {
                format!(
                    "&bull; <a href=\"{}\" target=\"_blank\">{}</a>",
                    encode_double_quoted_attribute(&n.link),
                    encode_text(&n.title)
                )
            })
            .collect::<Vec<_>>()
            .join("<br>")
    };

    format!(
        "<tr><td><b>{}</b></td><td>{:.2}$</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td><td>{}</td></tr>\n",
        encode_text(c.ticker.as_str()),
        c.price,
        c.classification.label(),
        c.condition.label(),
        c.rvol,
        encode_text(enrichment.insider.label()),
        news
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TickerSymbol;
    use crate::enrichment::{Enrichment, InsiderSummary, NewsItem, NewsRef};
    use crate::screener::aggregator::{aggregate, RunSummary};
    use crate::screener::classifier::{Classification, Condition};
    use crate::universe::UniverseOrigin;

    fn candidate(ticker: &str, rvol: f64, enrichment: Option<Enrichment>) -> CandidateRecord {
        CandidateRecord {
            ticker: TickerSymbol::parse(ticker).unwrap(),
            price: 123.456,
            classification: Classification::Recovery,
            condition: Condition::NearMa150,
            rvol,
            ma50: 110.0,
            ma150: 121.0,
            perf6m: -31.0,
            distance_ma50: 12.2,
            distance_ma150: 2.03,
            enrichment,
        }
    }

    fn result(candidates: Vec<CandidateRecord>) -> ScanResult {
        let mut run = RunSummary::start(
            UniverseOrigin::Live {
                sources: vec!["sp500".into()],
            },
            500,
            "|price-MA50| or |price-MA150| < 5%, recovery < -25%".into(),
        );
        run.stats.scanned = 480;
        run.stats.accepted = candidates.len();
        aggregate(candidates, run)
    }

    fn enriched() -> Enrichment {
        Enrichment {
            news: NewsRef::Items(vec![
                NewsItem {
                    title: "Q3 <beats> & raises".into(),
                    link: "https://example.com/a?x=1&y=\"2\"".into(),
                },
                NewsItem {
                    title: "Second".into(),
                    link: "https://example.com/b".into(),
                },
            ]),
            insider: InsiderSummary::Sell,
        }
    }

    #[test]
    fn test_empty_html_has_single_message() {
        let html = ScreenerReport::new(result(Vec::new())).to_html();
        assert_eq!(html.matches(NO_MATCHES_MESSAGE).count(), 1);
        assert!(!html.contains("<table"));
        assert!(html.contains("Scanned 480 tickers"));
    }

    #[test]
    fn test_html_table() {
        let html = ScreenerReport::new(result(vec![
            candidate("AAPL", 2.5, Some(enriched())),
            candidate("MSFT", 1.1, None),
        ]))
        .to_html();

        assert!(html.contains("<th>Latest News</th>"));
        assert!(html.contains("480 tickers | 2 matches"));
        assert!(html.contains("<td>123.46$</td>"));
        assert!(html.contains("<td>Recovery</td><td>Near MA150</td><td>2.50</td><td>Sell</td>"));
        assert!(html.contains("Q3 &lt;beats&gt; &amp; raises"));
        assert!(html.contains("href=\"https://example.com/a?x=1&amp;y=&quot;2&quot;\""));
        assert!(html.contains("target=\"_blank\""));
        assert!(html.contains("</a><br>&bull;"));
        // unenriched row falls back to placeholders
        assert!(html.contains("<td>No Data</td><td>No News</td>"));
        assert!(!html.contains(NO_MATCHES_MESSAGE));
    }

    #[test]
    fn test_markdown() {
        let md = ScreenerReport::new(result(vec![candidate("AAPL", 2.5, Some(enriched()))]))
            .to_markdown();
        assert!(md.contains("- **Matched**: 1"));
        assert!(md.contains("| AAPL | 123.46$ | Recovery | Near MA150 | 2.50 | -31.0 | Sell |"));

        let empty = ScreenerReport::new(result(Vec::new())).to_markdown();
        assert!(empty.contains(NO_MATCHES_MESSAGE));
    }

    #[test]
    fn test_json() {
        let json = ScreenerReport::new(result(vec![candidate("AAPL", 2.5, None)])).to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["candidates"][0]["ticker"], "AAPL");
        assert_eq!(value["candidates"][0]["condition"], "NearMA150");
        assert_eq!(value["universe_origin"]["kind"], "live");
        assert_eq!(value["stats"]["scanned"], 480);
    }

    #[test]
    fn test_report_format_parsing() {
        assert_eq!("html".parse::<ReportFormat>().unwrap(), ReportFormat::Html);
        assert_eq!("JSON".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("md".parse::<ReportFormat>().unwrap(), ReportFormat::Markdown);
        assert!("pdf".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::Markdown.to_string(), "markdown");
    }

    #[test]
    fn test_save_to_file_adds_extension() {
        let dir = tempfile::tempdir().unwrap();
        let report = ScreenerReport::new(result(Vec::new()));

        let path = report
            .save_to_file(&dir.path().join("out/report"), ReportFormat::Json)
            .unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("json"));
        assert!(path.exists());

        let html_path = report
            .save_to_file(&dir.path().join("index.html"), ReportFormat::Html)
            .unwrap();
        let written = std::fs::read_to_string(html_path).unwrap();
        assert!(written.contains(NO_MATCHES_MESSAGE));
    }
}

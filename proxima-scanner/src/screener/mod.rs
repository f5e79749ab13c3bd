//! Moving-average proximity screener.
//!
//! # Pipeline
//!
//! ```text
//! ┌──────────┐   ┌───────────────────────────────────────┐   ┌───────────┐
//! │ Universe │──▶│ worker pool (buffer_unordered)         │──▶│ Aggregate │──▶ Report
//! │ Resolver │   │ fetch → signals → classify → enrich    │   │  & Rank   │
//! └──────────┘   └───────────────────────────────────────┘   └───────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use proxima_scanner::screener::{ScreenerEngine, ScreenerReport, ReportFormat};
//!
//! let engine = ScreenerEngine::from_config(config);
//! let result = engine.run().await;
//! ScreenerReport::new(result).save_to_file(path, ReportFormat::Html)?;
//! ```

pub mod aggregator;
pub mod classifier;
pub mod engine;
pub mod report;

pub use aggregator::{aggregate, rank_order, RunSummary, ScanResult, ScanStats};
pub use classifier::{CandidateRecord, Classification, Classifier, Condition, Verdict};
pub use engine::ScreenerEngine;
pub use report::{ReportFormat, ScreenerReport, NO_MATCHES_MESSAGE};

//! Command-line interface.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use proxima_common::logging::init_logging;
use proxima_common::ScannerConfig;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::screener::{ReportFormat, ScreenerEngine, ScreenerReport};

/// Proxima - moving-average proximity screener.
#[derive(Parser, Debug)]
#[command(name = "proxima")]
#[command(version)]
#[command(about = "Scan US equities trading near their 50/150-day moving averages", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.proxima/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one scan and write the report
    Scan {
        /// Report path (default from config: index.html)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format (html, json, markdown)
        #[arg(short, long)]
        format: Option<ReportFormat>,

        /// Comma-separated symbols to scan instead of the resolved universe
        #[arg(long, value_delimiter = ',')]
        symbols: Option<Vec<String>>,

        /// Proximity threshold in percent
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Resolve and print the ticker universe
    Universe,

    /// Print the effective configuration as JSON
    Config,
}

/// Overrides given on the `scan` command line.
#[derive(Debug, Default, Clone)]
pub struct ScanOverrides {
    pub output: Option<PathBuf>,
    pub format: Option<ReportFormat>,
    pub threshold: Option<f64>,
}

impl ScanOverrides {
    /// Fold the overrides into `config`.
    pub fn apply(&self, config: &mut ScannerConfig) {
        if let Some(threshold) = self.threshold {
            config.screen.proximity_threshold_pct = threshold;
        }
        if let Some(output) = &self.output {
            config.output.path = output.display().to_string();
        }
        if let Some(format) = self.format {
            config.output.format = format.to_string();
        }
    }
}

/// Load, override, and validate configuration.
pub fn load_config(path: Option<&Path>, overrides: &ScanOverrides) -> Result<ScannerConfig> {
    let mut config = ScannerConfig::load_with_env(path)?;
    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let overrides = match &cli.command {
        Commands::Scan {
            output,
            format,
            threshold,
            ..
        } => ScanOverrides {
            output: output.clone(),
            format: *format,
            threshold: *threshold,
        },
        _ => ScanOverrides::default(),
    };

    let config = load_config(cli.config.as_deref(), &overrides)?;
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    match cli.command {
        Commands::Scan { symbols, .. } => scan(config, symbols).await,
        Commands::Universe => {
            let engine = ScreenerEngine::from_config(config);
            let universe = engine.resolve_universe().await;
            info!(symbols = universe.len(), origin = %universe.origin, "Universe resolved");
            for symbol in &universe.symbols {
                println!("{}", symbol);
            }
            Ok(())
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn scan(config: ScannerConfig, symbols: Option<Vec<String>>) -> Result<()> {
    let format: ReportFormat = config
        .output
        .format
        .parse()
        .map_err(|e: String| anyhow!(e))?;
    let path = PathBuf::from(&config.output.path);

    info!("Proxima v{}", env!("CARGO_PKG_VERSION"));
    info!(criteria = %config.summary(), "Screening");

    let engine = ScreenerEngine::from_config(config);
    let result = match symbols {
        Some(symbols) => engine.run_symbols(symbols).await,
        None => engine.run().await,
    };

    let summary = result.summary();
    let written = ScreenerReport::new(result).save_to_file(&path, format)?;

    info!(path = %written.display(), "Report written");
    println!("{}", summary);
    println!("Report: {}", written.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan_flags() {
        let cli = Cli::try_parse_from([
            "proxima",
            "scan",
            "--output",
            "out/report.json",
            "--format",
            "json",
            "--symbols",
            "AAPL,msft,BRK.B",
            "--threshold",
            "3.5",
        ])
        .unwrap();

        match cli.command {
            Commands::Scan {
                output,
                format,
                symbols,
                threshold,
            } => {
                assert_eq!(output, Some(PathBuf::from("out/report.json")));
                assert_eq!(format, Some(ReportFormat::Json));
                assert_eq!(
                    symbols,
                    Some(vec!["AAPL".to_string(), "msft".into(), "BRK.B".into()])
                );
                assert_eq!(threshold, Some(3.5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["proxima", "universe", "--config", "/tmp/c.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
        assert!(matches!(cli.command, Commands::Universe));
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["proxima", "scan", "--format", "pdf"]).is_err());
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = ScannerConfig::default();
        ScanOverrides {
            output: Some(PathBuf::from("report.md")),
            format: Some(ReportFormat::Markdown),
            threshold: Some(2.0),
        }
        .apply(&mut config);

        assert_eq!(config.screen.proximity_threshold_pct, 2.0);
        assert_eq!(config.output.path, "report.md");
        assert_eq!(config.output.format, "markdown");
    }

    #[test]
    fn test_load_config_rejects_invalid_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{}").unwrap();

        let overrides = ScanOverrides {
            threshold: Some(-1.0),
            ..ScanOverrides::default()
        };
        assert!(load_config(Some(&path), &overrides).is_err());
        assert!(load_config(Some(&path), &ScanOverrides::default()).is_ok());
    }
}

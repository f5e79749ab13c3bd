//! Proxima - batch moving-average proximity screener.

use anyhow::Result;
use clap::Parser;
use proxima_scanner::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}

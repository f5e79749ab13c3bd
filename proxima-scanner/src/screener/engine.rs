//! Screener engine module.
//!
//! Orchestrates one batch run: resolve the universe, fetch and classify
//! every ticker through a bounded worker pool, enrich accepted candidates,
//! and rank them into a `ScanResult`.

use futures::StreamExt;
use proxima_common::{Lookback, ScannerConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::data::{
    shared_limiter, FetchOutcome, SeriesFetcher, SeriesProvider, TickerSymbol, UnavailableReason,
    YahooChartProvider,
};
use crate::enrichment::{Enricher, EnrichmentProvider, YahooEnrichmentProvider};
use crate::signal::{compute_signals, SignalError};
use crate::universe::{ResolvedUniverse, UniverseResolver};

use super::aggregator::{aggregate, RunSummary, ScanResult};
use super::classifier::{CandidateRecord, Classifier};

/// What happened to one ticker.
#[derive(Debug)]
enum TickerOutcome {
    Unavailable(UnavailableReason),
    Rejected,
    Accepted(Box<CandidateRecord>),
}

/// The central orchestrator for screening runs.
pub struct ScreenerEngine {
    config: ScannerConfig,
    resolver: UniverseResolver,
    fetcher: SeriesFetcher,
    classifier: Classifier,
    enricher: Enricher,
}

impl ScreenerEngine {
    /// Create an engine from explicit collaborators.
    pub fn new(
        config: ScannerConfig,
        resolver: UniverseResolver,
        fetcher: SeriesFetcher,
        enricher: Enricher,
    ) -> Self {
        let classifier = Classifier::new(&config.screen);
        Self {
            config,
            resolver,
            fetcher,
            classifier,
            enricher,
        }
    }

    /// Create an engine backed by Yahoo Finance and the configured universe
    /// sources. Series and enrichment requests share one rate limiter.
    pub fn from_config(config: ScannerConfig) -> Self {
        let limiter = shared_limiter("yahoo", config.fetch.requests_per_minute);

        let provider: Arc<dyn SeriesProvider> =
            Arc::new(YahooChartProvider::from_config(&config.fetch));
        let fetcher = SeriesFetcher::from_config(provider, limiter.clone(), &config.fetch);

        let enricher = if config.enrichment.enabled {
            let provider: Arc<dyn EnrichmentProvider> =
                Arc::new(YahooEnrichmentProvider::from_config(&config.enrichment));
            Enricher::new(provider, limiter, &config.enrichment)
        } else {
            Enricher::disabled(limiter)
        };

        let resolver = UniverseResolver::from_config(
            &config.universe,
            Duration::from_secs(config.fetch.request_timeout_secs),
        );

        Self::new(config, resolver, fetcher, enricher)
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Resolve the configured universe.
    pub async fn resolve_universe(&self) -> ResolvedUniverse {
        debug!(sources = self.resolver.source_count(), "Resolving universe");
        self.resolver.resolve().await
    }

    /// Run a full scan over the resolved universe.
    pub async fn run(&self) -> ScanResult {
        let universe = self.resolve_universe().await;
        self.scan(universe).await
    }

    /// Run a scan over caller-supplied symbols, skipping universe
    /// resolution.
    pub async fn run_symbols<I, S>(&self, symbols: I) -> ScanResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.scan(ResolvedUniverse::explicit(symbols)).await
    }

    /// Scan a resolved universe.
    ///
    /// Never fails. Per-ticker failures are counted and skipped; when the
    /// optional run timeout fires, whatever was accepted so far is ranked.
    pub async fn scan(&self, universe: ResolvedUniverse) -> ScanResult {
        let mut run = RunSummary::start(universe.origin.clone(), universe.len(), self.config.summary());
        let concurrency = self.config.scan.concurrency.max(1);
        let lookback = self.config.fetch.lookback;

        info!(
            scan_id = %run.id,
            universe = universe.len(),
            origin = %universe.origin,
            backup = universe.is_backup(),
            concurrency,
            "Starting scan"
        );

        let deadline = self
            .config
            .scan
            .run_timeout_secs
            .map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));

        let outcomes = futures::stream::iter(universe.symbols)
            .map(|symbol| async move { self.process_ticker(symbol, lookback).await })
            .buffer_unordered(concurrency);
        let mut outcomes = std::pin::pin!(outcomes);

        let mut candidates = Vec::new();
        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, outcomes.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(
                            scan_id = %run.id,
                            completed = run.stats.scanned,
                            remaining = run.stats.universe_size - run.stats.scanned,
                            "Run timeout reached, reporting partial results"
                        );
                        run.timed_out = true;
                        break;
                    }
                },
                None => outcomes.next().await,
            };
            let Some(outcome) = next else {
                break;
            };

            run.stats.scanned += 1;
            match outcome {
                TickerOutcome::Unavailable(_) => run.stats.unavailable += 1,
                TickerOutcome::Rejected => run.stats.rejected += 1,
                TickerOutcome::Accepted(candidate) => {
                    run.stats.accepted += 1;
                    candidates.push(*candidate);
                }
            }
        }

        info!(
            scan_id = %run.id,
            scanned = run.stats.scanned,
            unavailable = run.stats.unavailable,
            rejected = run.stats.rejected,
            accepted = run.stats.accepted,
            "Scan phase complete"
        );

        let result = aggregate(candidates, run);
        info!(scan_id = %result.id, "{}", result.summary());
        result
    }

    /// Fetch, compute, classify, and enrich one ticker.
    async fn process_ticker(&self, symbol: TickerSymbol, lookback: Lookback) -> TickerOutcome {
        let series = match self.fetcher.fetch(&symbol, lookback).await {
            FetchOutcome::Series(series) => series,
            FetchOutcome::Unavailable(reason) => {
                debug!(symbol = %symbol, reason = %reason, "Ticker unavailable");
                return TickerOutcome::Unavailable(reason);
            }
        };

        let snapshot = match compute_signals(&series, &self.config.screen.windows) {
            Ok(snapshot) => snapshot,
            Err(SignalError::InsufficientHistory { needed, available }) => {
                debug!(symbol = %symbol, needed, available, "Series too short for signal windows");
                return TickerOutcome::Unavailable(UnavailableReason::InsufficientHistory {
                    needed,
                    available,
                });
            }
        };

        let Some(mut candidate) = self.classifier.classify(&symbol, &snapshot).accepted() else {
            return TickerOutcome::Rejected;
        };

        debug!(
            symbol = %symbol,
            condition = %candidate.condition,
            classification = %candidate.classification,
            rvol = candidate.rvol,
            "Ticker accepted"
        );

        if self.enricher.is_enabled() {
            candidate.apply_enrichment(self.enricher.enrich(&symbol).await);
        }

        TickerOutcome::Accepted(Box::new(candidate))
    }
}

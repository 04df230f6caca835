//! Core library for a personal stock and crypto portfolio tracker.
//!
//! Holdings live in human-editable YAML files (one portfolio per file,
//! symbols mapping to purchase lots). Market prices come from Yahoo
//! Finance through a pluggable provider seam and are held in a
//! time-windowed quote cache with a JSON mirror on disk. On top of that,
//! aggregation flattens lots into per-`(portfolio, symbol)` position rows,
//! with statistics, multi-key sorting, and lot-age analysis derived from
//! the rows.
//!
//! [`StockTracker`] is the facade the CLI talks to; every layer underneath
//! is also usable on its own.

pub mod config;
pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

pub use config::AppConfig;
pub use errors::CoreError;

use chrono::NaiveDate;

use crate::models::position::PositionRow;
use crate::models::quote::QuoteCache;
use crate::models::stats::PortfolioStats;
use crate::models::stock::Holding;
use crate::providers::traits::QuoteProvider;
use crate::providers::yahoo::YahooProvider;
use crate::services::aggregation_service::{self, AggregationOptions};
use crate::services::lot_analysis::{self, LotMetrics, LotPerformance};
use crate::services::quote_service::{self, QuoteService};
use crate::services::sort;
use crate::services::stats_service;
use crate::storage::cache_store;
use crate::storage::portfolio_store::{LotUpdate, PortfolioStore};

/// What a quote refresh actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Symbols that needed a network fetch this run.
    pub requested: usize,
    /// Symbols that still have no quote after all retries.
    pub missing: usize,
}

/// Application facade wiring config, portfolio storage, the quote cache,
/// and the quote service together.
pub struct StockTracker {
    config: AppConfig,
    store: PortfolioStore,
    cache: QuoteCache,
    quotes: QuoteService,
}

impl StockTracker {
    /// Build a tracker backed by the Yahoo Finance provider.
    pub fn new(config: AppConfig) -> Self {
        let provider = YahooProvider::new(config.api.yahoo.timeout);
        Self::with_provider(config, Box::new(provider))
    }

    /// Build a tracker with an injected quote provider. This is the seam
    /// tests use to avoid the network.
    pub fn with_provider(config: AppConfig, provider: Box<dyn QuoteProvider>) -> Self {
        let cache = cache_store::load(&config.paths.cache_file, config.api.yahoo.cache_duration);
        let quotes = QuoteService::new(
            provider,
            config.api.yahoo.retries,
            Some(config.paths.cache_file.clone()),
        );
        let store = PortfolioStore::new(&config.paths.portfolios_dir);
        Self {
            config,
            store,
            cache,
            quotes,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    // ── Portfolio data ──────────────────────────────────────────────

    /// (Re)load every portfolio file from the portfolios directory.
    pub fn load_portfolios(&mut self) -> Result<(), CoreError> {
        self.store.load()
    }

    pub fn portfolio_names(&self) -> Vec<&str> {
        self.store.names()
    }

    pub fn store(&self) -> &PortfolioStore {
        &self.store
    }

    /// Filtered, flattened holdings under the given options.
    pub fn holdings(&self, opts: &AggregationOptions) -> Vec<Holding> {
        aggregation_service::filter_holdings(self.store.all_holdings(), opts)
    }

    // ── Quotes ──────────────────────────────────────────────────────

    /// Fetch quotes for every filtered symbol that needs one.
    ///
    /// `live` discards the in-memory cache first, forcing a fresh fetch of
    /// every symbol this run. Manually-priced symbols are never fetched.
    pub async fn refresh_quotes(
        &mut self,
        opts: &AggregationOptions,
        live: bool,
    ) -> RefreshSummary {
        if live {
            self.cache.clear();
        }

        let holdings = self.holdings(opts);
        let symbols = aggregation_service::symbols_of(&holdings);
        let manual = aggregation_service::manual_priced_symbols(&holdings);
        let to_fetch = quote_service::fetch_set(&self.cache, &symbols, &manual);

        let missing = self.quotes.get_many(&mut self.cache, &to_fetch).await;
        RefreshSummary {
            requested: to_fetch.len(),
            missing,
        }
    }

    // ── Derived views ───────────────────────────────────────────────

    /// Build, then sort, the position table. `sort_specs` holds column
    /// names; an invalid name falls back to the default order with a
    /// warning rather than failing the run.
    pub fn positions(
        &self,
        opts: &AggregationOptions,
        sort_specs: &[String],
        descending: bool,
    ) -> Vec<PositionRow> {
        let holdings = self.holdings(opts);
        let mut rows = aggregation_service::build_rows(&holdings, &self.cache, opts);
        let (keys, _fell_back) = sort::parse_keys(sort_specs);
        sort::sort_rows(&mut rows, &keys, descending);
        rows
    }

    /// Portfolio statistics over an already-built row set. `None` when
    /// there are no rows.
    pub fn stats(&self, rows: &[PositionRow]) -> Option<PortfolioStats> {
        stats_service::compute(rows)
    }

    /// Per-lot performance for every filtered holding, as of `today`.
    /// Lots of symbols without a resolvable price still appear, with age
    /// metrics only.
    pub fn lot_performance(
        &self,
        opts: &AggregationOptions,
        today: NaiveDate,
    ) -> Vec<LotPerformance> {
        let holdings = self.holdings(opts);
        let mut all = Vec::new();
        for holding in &holdings {
            let price = aggregation_service::resolve_price(holding, &self.cache)
                .map(|r| r.price());
            all.extend(lot_analysis::analyze_holding(holding, price, today));
        }
        all
    }

    /// Aggregate metrics over a lot-performance set.
    pub fn lot_metrics(&self, lots: &[LotPerformance]) -> Option<LotMetrics> {
        lot_analysis::metrics(lots)
    }

    // ── Mutations (delegated to the portfolio store) ────────────────

    pub fn create_portfolio(&mut self, name: &str) -> Result<(), CoreError> {
        self.store.create_portfolio(name)
    }

    pub fn delete_portfolio(&mut self, name: &str) -> Result<(), CoreError> {
        self.store.delete_portfolio(name)
    }

    pub fn backup_portfolio(&self, name: &str) -> Result<std::path::PathBuf, CoreError> {
        self.store.backup_portfolio(name)
    }

    pub fn restore_portfolio(&mut self, name: &str) -> Result<(), CoreError> {
        self.store.restore_portfolio(name)
    }

    pub fn add_symbol(
        &mut self,
        portfolio: &str,
        symbol: &str,
        description: &str,
    ) -> Result<(), CoreError> {
        self.store.add_symbol(portfolio, symbol, description)
    }

    pub fn remove_symbol(&mut self, portfolio: &str, symbol: &str) -> Result<(), CoreError> {
        self.store.remove_symbol(portfolio, symbol)
    }

    pub fn add_lot(
        &mut self,
        portfolio: &str,
        symbol: &str,
        lot: models::lot::Lot,
    ) -> Result<(), CoreError> {
        self.store.add_lot(portfolio, symbol, lot)
    }

    pub fn remove_lot(
        &mut self,
        portfolio: &str,
        symbol: &str,
        index: usize,
    ) -> Result<(), CoreError> {
        self.store.remove_lot(portfolio, symbol, index)
    }

    pub fn update_lot(
        &mut self,
        portfolio: &str,
        symbol: &str,
        index: usize,
        update: LotUpdate,
    ) -> Result<(), CoreError> {
        self.store.update_lot(portfolio, symbol, index, update)
    }
}

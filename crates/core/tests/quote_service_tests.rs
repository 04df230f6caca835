use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tempfile::TempDir;

use stock_tracker_core::config::AppConfig;
use stock_tracker_core::errors::CoreError;
use stock_tracker_core::models::quote::{Quote, QuoteCache};
use stock_tracker_core::providers::traits::QuoteProvider;
use stock_tracker_core::services::aggregation_service::AggregationOptions;
use stock_tracker_core::services::quote_service::{self, QuoteService};
use stock_tracker_core::storage::cache_store;
use stock_tracker_core::StockTracker;

/// Provider that fails a fixed number of times, then serves a flat price.
/// Counts every attempt.
struct ScriptedProvider {
    calls: Arc<AtomicUsize>,
    fail_first: usize,
    price: f64,
}

impl ScriptedProvider {
    fn new(fail_first: usize, price: f64) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
                fail_first,
                price,
            },
            calls,
        )
    }
}

#[async_trait]
impl QuoteProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_first {
            return Err(CoreError::Network("connection reset".to_string()));
        }
        Ok(Quote {
            symbol: symbol.to_string(),
            current_price: self.price,
            open_price: self.price - 1.0,
            description: format!("{symbol} Inc."),
            fetched_at: 0,
        })
    }
}

fn service(provider: ScriptedProvider, retries: u32) -> QuoteService {
    QuoteService::new(Box::new(provider), retries, None)
}

mod caching {
    use super::*;

    #[tokio::test]
    async fn second_get_within_the_window_hits_the_cache() {
        let (provider, calls) = ScriptedProvider::new(0, 175.0);
        let svc = service(provider, 0);
        let mut cache = QuoteCache::new(300);

        let first = svc.get(&mut cache, "AAPL").await.unwrap();
        let second = svc.get(&mut cache, "AAPL").await.unwrap();

        assert_eq!(first.current_price, 175.0);
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_triggers_a_refetch() {
        let (provider, calls) = ScriptedProvider::new(0, 175.0);
        let svc = service(provider, 0);

        let mut cache = QuoteCache::new(300);
        cache.insert(
            Quote {
                symbol: "AAPL".to_string(),
                current_price: 150.0,
                open_price: 150.0,
                description: String::new(),
                fetched_at: 0,
            },
            0, // fetched at the epoch: long expired
        );

        let quote = svc.get(&mut cache, "AAPL").await.unwrap();
        assert_eq!(quote.current_price, 175.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn successful_fetch_persists_the_cache_mirror() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache.json");
        let (provider, _) = ScriptedProvider::new(0, 175.0);
        let svc = QuoteService::new(Box::new(provider), 0, Some(path.clone()));
        let mut cache = QuoteCache::new(300);

        svc.get(&mut cache, "AAPL").await.unwrap();

        let mirrored = cache_store::load(&path, 300);
        assert_eq!(mirrored.get("AAPL").unwrap().current_price, 175.0);
    }
}

mod retries {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let (provider, calls) = ScriptedProvider::new(2, 175.0);
        let svc = service(provider, 3);
        let mut cache = QuoteCache::new(300);

        let quote = svc.get(&mut cache, "AAPL").await;
        assert_eq!(quote.unwrap().current_price, 175.0);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_yield_none_not_an_error() {
        let (provider, calls) = ScriptedProvider::new(usize::MAX, 0.0);
        let svc = service(provider, 2);
        let mut cache = QuoteCache::new(300);

        assert!(svc.get(&mut cache, "AAPL").await.is_none());
        // Initial attempt plus two retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn get_many_counts_symbols_left_without_quotes() {
        let (provider, _) = ScriptedProvider::new(usize::MAX, 0.0);
        let svc = service(provider, 0);
        let mut cache = QuoteCache::new(300);

        let missing = svc
            .get_many(&mut cache, &["AAPL".to_string(), "MSFT".to_string()])
            .await;
        assert_eq!(missing, 2);
    }
}

mod fetch_planning {
    use super::*;

    #[test]
    fn valid_cached_and_manual_symbols_are_not_fetched() {
        let mut cache = QuoteCache::new(300);
        cache.insert(
            Quote {
                symbol: "CACHED".to_string(),
                current_price: 10.0,
                open_price: 10.0,
                description: String::new(),
                fetched_at: 0,
            },
            QuoteCache::now(),
        );

        let symbols = vec![
            "CACHED".to_string(),
            "MANUAL".to_string(),
            "FRESH".to_string(),
        ];
        let manual = vec!["MANUAL".to_string()];

        assert_eq!(
            quote_service::fetch_set(&cache, &symbols, &manual),
            vec!["FRESH".to_string()]
        );
    }
}

mod tracker_facade {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn config_in(tmp: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.paths.portfolios_dir = tmp.path().join("portfolios");
        config.paths.cache_file = tmp.path().join("cache.json");
        config
    }

    fn seed_portfolio(tmp: &TempDir) {
        let dir = tmp.path().join("portfolios");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("main.yaml"),
            "\
name: main
stocks:
  AAPL:
    lots:
      - date: \"2024-01-15\"
        shares: 10
        cost_basis: 150
  BTC-USD:
    lots:
      - date: \"2024-01-15\"
        shares: 0.5
        cost_basis: 40000
",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn refresh_then_positions_end_to_end() {
        let tmp = TempDir::new().unwrap();
        seed_portfolio(&tmp);
        let (provider, calls) = ScriptedProvider::new(0, 175.0);
        let mut tracker = StockTracker::with_provider(config_in(&tmp), Box::new(provider));
        tracker.load_portfolios().unwrap();

        let opts = AggregationOptions {
            max_description_length: 28,
            ..AggregationOptions::default()
        };

        let summary = tracker.refresh_quotes(&opts, false).await;
        // Crypto is filtered out, so only AAPL gets fetched.
        assert_eq!(summary.requested, 1);
        assert_eq!(summary.missing, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let rows = tracker.positions(&opts, &[], false);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "AAPL");
        assert_eq!(rows[0].value, 1750.0);

        let stats = tracker.stats(&rows).unwrap();
        assert_eq!(stats.totals.cost, 1500.0);
    }

    #[tokio::test]
    async fn live_refresh_discards_the_warm_cache() {
        let tmp = TempDir::new().unwrap();
        seed_portfolio(&tmp);
        let (provider, calls) = ScriptedProvider::new(0, 175.0);
        let mut tracker = StockTracker::with_provider(config_in(&tmp), Box::new(provider));
        tracker.load_portfolios().unwrap();

        let opts = AggregationOptions {
            max_description_length: 28,
            ..AggregationOptions::default()
        };

        tracker.refresh_quotes(&opts, false).await;
        // Cached run: nothing to fetch.
        let summary = tracker.refresh_quotes(&opts, false).await;
        assert_eq!(summary.requested, 0);
        // Live run: the warm cache is dropped and refetched.
        let summary = tracker.refresh_quotes(&opts, true).await;
        assert_eq!(summary.requested, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn lot_performance_reads_prices_from_the_cache() {
        let tmp = TempDir::new().unwrap();
        seed_portfolio(&tmp);
        let (provider, _) = ScriptedProvider::new(0, 175.0);
        let mut tracker = StockTracker::with_provider(config_in(&tmp), Box::new(provider));
        tracker.load_portfolios().unwrap();

        let opts = AggregationOptions {
            max_description_length: 28,
            ..AggregationOptions::default()
        };
        tracker.refresh_quotes(&opts, false).await;

        let lots = tracker.lot_performance(&opts, d(2025, 1, 15));
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].symbol, "AAPL");
        assert_eq!(lots[0].days_held, 366);
        assert_eq!(lots[0].current_value, Some(1750.0));

        let metrics = tracker.lot_metrics(&lots).unwrap();
        assert_eq!(metrics.total_lots, 1);
        assert_eq!(metrics.long_term_lots, 1);
    }
}

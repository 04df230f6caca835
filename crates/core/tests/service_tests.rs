use chrono::NaiveDate;

use stock_tracker_core::models::lot::Lot;
use stock_tracker_core::models::position::PositionRow;
use stock_tracker_core::models::quote::{Quote, QuoteCache};
use stock_tracker_core::models::stock::Holding;
use stock_tracker_core::services::aggregation_service::{self, AggregationOptions};
use stock_tracker_core::services::lot_analysis;
use stock_tracker_core::services::sort::{self, SortKey};
use stock_tracker_core::services::stats_service;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn holding(portfolio: &str, symbol: &str, lots: Vec<Lot>) -> Holding {
    Holding {
        portfolio: portfolio.to_string(),
        symbol: symbol.to_string(),
        description: String::new(),
        notes: String::new(),
        unvested: false,
        lots,
    }
}

fn cache_with(entries: &[(&str, f64, f64)]) -> QuoteCache {
    let mut cache = QuoteCache::new(300);
    for &(symbol, price, open) in entries {
        cache.insert(
            Quote {
                symbol: symbol.to_string(),
                current_price: price,
                open_price: open,
                description: format!("{symbol} Inc."),
                fetched_at: 0,
            },
            QuoteCache::now(),
        );
    }
    cache
}

fn opts() -> AggregationOptions {
    AggregationOptions {
        include_crypto: false,
        include_unvested: false,
        day_mode: false,
        max_description_length: 28,
        crypto_symbols: vec![],
    }
}

mod filtering {
    use super::*;

    #[test]
    fn crypto_is_excluded_by_default() {
        let holdings = vec![
            holding("main", "AAPL", vec![Lot::new(d(2024, 1, 1), 1.0, 1.0)]),
            holding("main", "BTC-USD", vec![Lot::new(d(2024, 1, 1), 1.0, 1.0)]),
        ];

        let kept = aggregation_service::filter_holdings(holdings.clone(), &opts());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].symbol, "AAPL");

        let mut with_crypto = opts();
        with_crypto.include_crypto = true;
        let kept = aggregation_service::filter_holdings(holdings, &with_crypto);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn unvested_holdings_are_excluded_by_default() {
        let mut grant = holding("grants", "AAPL", vec![Lot::new(d(2024, 1, 1), 1.0, 1.0)]);
        grant.unvested = true;
        let holdings = vec![
            holding("main", "MSFT", vec![Lot::new(d(2024, 1, 1), 1.0, 1.0)]),
            grant,
        ];

        let kept = aggregation_service::filter_holdings(holdings.clone(), &opts());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].portfolio, "main");

        let mut with_unvested = opts();
        with_unvested.include_unvested = true;
        assert_eq!(
            aggregation_service::filter_holdings(holdings, &with_unvested).len(),
            2
        );
    }

    #[test]
    fn symbols_are_deduplicated_across_portfolios() {
        let holdings = vec![
            holding("main", "AAPL", vec![]),
            holding("ira", "AAPL", vec![]),
            holding("main", "MSFT", vec![]),
        ];
        assert_eq!(
            aggregation_service::symbols_of(&holdings),
            vec!["AAPL".to_string(), "MSFT".to_string()]
        );
    }

    #[test]
    fn manual_priced_symbols_are_detected() {
        let mut priced_lot = Lot::new(d(2024, 1, 1), 1.0, 1.0);
        priced_lot.manual_price = Some(5.0);
        let holdings = vec![
            holding("main", "PRIV", vec![priced_lot]),
            holding("main", "AAPL", vec![Lot::new(d(2024, 1, 1), 1.0, 1.0)]),
        ];
        assert_eq!(
            aggregation_service::manual_priced_symbols(&holdings),
            vec!["PRIV".to_string()]
        );
    }
}

mod aggregation {
    use super::*;

    #[test]
    fn single_lot_position_gains() {
        // 10 shares @ $150, now $175: gain $250, 16.67%.
        let holdings = vec![holding(
            "main",
            "AAPL",
            vec![Lot::new(d(2024, 1, 15), 10.0, 150.0)],
        )];
        let cache = cache_with(&[("AAPL", 175.0, 170.0)]);

        let rows = aggregation_service::build_rows(&holdings, &cache, &opts());
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.quantity, 10.0);
        assert_eq!(row.ave_cost, 150.0);
        assert_eq!(row.price, 175.0);
        assert_eq!(row.cost, 1500.0);
        assert_eq!(row.value, 1750.0);
        assert_eq!(row.gain_dollars, 250.0);
        assert!((row.gain_pct - 16.666_666_666_666_668).abs() < 1e-9);
        assert!(!row.is_fractional);
    }

    #[test]
    fn lots_aggregate_into_one_row() {
        // 5 @ $100 + 5 @ $120: qty 10, cost $1100, ave $110.
        let holdings = vec![holding(
            "main",
            "MSFT",
            vec![
                Lot::new(d(2024, 1, 1), 5.0, 100.0),
                Lot::new(d(2024, 2, 1), 5.0, 120.0),
            ],
        )];
        let cache = cache_with(&[("MSFT", 130.0, 125.0)]);

        let rows = aggregation_service::build_rows(&holdings, &cache, &opts());
        let row = &rows[0];
        assert_eq!(row.quantity, 10.0);
        assert_eq!(row.cost, 1100.0);
        assert_eq!(row.ave_cost, 110.0);
        assert_eq!(row.value, 1300.0);
        assert_eq!(row.gain_dollars, 200.0);
    }

    #[test]
    fn same_symbol_in_two_portfolios_stays_two_rows() {
        let holdings = vec![
            holding("main", "AAPL", vec![Lot::new(d(2024, 1, 1), 10.0, 150.0)]),
            holding("ira", "AAPL", vec![Lot::new(d(2024, 1, 1), 2.0, 90.0)]),
        ];
        let cache = cache_with(&[("AAPL", 175.0, 170.0)]);

        let rows = aggregation_service::build_rows(&holdings, &cache, &opts());
        assert_eq!(rows.len(), 2);
        assert_ne!(rows[0].portfolio, rows[1].portfolio);
        // Both rows price off the same shared quote.
        assert_eq!(rows[0].price, 175.0);
        assert_eq!(rows[1].price, 175.0);
    }

    #[test]
    fn manual_price_wins_when_quote_price_is_zero() {
        let mut lot = Lot::new(d(2024, 1, 1), 100.0, 10.0);
        lot.manual_price = Some(50.0);
        let holdings = vec![holding("main", "PRIV", vec![lot])];
        let cache = cache_with(&[("PRIV", 0.0, 0.0)]);

        let rows = aggregation_service::build_rows(&holdings, &cache, &opts());
        let row = &rows[0];
        assert_eq!(row.price, 50.0);
        assert_eq!(row.value, 5000.0);
        assert_eq!(row.gain_dollars, 4000.0);
    }

    #[test]
    fn unpriced_holding_is_skipped_not_fatal() {
        let holdings = vec![
            holding("main", "GHOST", vec![Lot::new(d(2024, 1, 1), 1.0, 1.0)]),
            holding("main", "AAPL", vec![Lot::new(d(2024, 1, 1), 1.0, 150.0)]),
        ];
        let cache = cache_with(&[("AAPL", 175.0, 170.0)]);

        let rows = aggregation_service::build_rows(&holdings, &cache, &opts());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "AAPL");
    }

    #[test]
    fn zero_cost_position_reports_full_gain() {
        // Promotional shares: cost 0, any positive value is a 100% gain.
        let holdings = vec![holding(
            "main",
            "FREE",
            vec![Lot::new(d(2024, 1, 1), 10.0, 0.0)],
        )];
        let cache = cache_with(&[("FREE", 5.0, 5.0)]);

        let rows = aggregation_service::build_rows(&holdings, &cache, &opts());
        let row = &rows[0];
        assert_eq!(row.cost, 0.0);
        assert_eq!(row.gain_dollars, 50.0);
        assert_eq!(row.gain_pct, 100.0);
    }

    #[test]
    fn fractional_quantities_are_flagged() {
        let holdings = vec![holding(
            "main",
            "VTI",
            vec![Lot::new(d(2024, 1, 1), 2.5, 200.0)],
        )];
        let cache = cache_with(&[("VTI", 220.0, 218.0)]);

        let rows = aggregation_service::build_rows(&holdings, &cache, &opts());
        assert!(rows[0].is_fractional);
    }

    #[test]
    fn long_descriptions_are_truncated_with_ellipsis() {
        let holdings = vec![holding(
            "main",
            "LONG",
            vec![Lot::new(d(2024, 1, 1), 1.0, 1.0)],
        )];
        let mut cache = QuoteCache::new(300);
        cache.insert(
            Quote {
                symbol: "LONG".to_string(),
                current_price: 1.0,
                open_price: 1.0,
                description: "An Exceptionally Verbose Company Name Incorporated".to_string(),
                fetched_at: 0,
            },
            QuoteCache::now(),
        );

        let mut options = opts();
        options.max_description_length = 12;
        let rows = aggregation_service::build_rows(&holdings, &cache, &options);
        assert_eq!(rows[0].description, "An Except...");
        assert_eq!(rows[0].description.chars().count(), 12);
    }
}

mod day_mode {
    use super::*;

    #[test]
    fn gains_measure_against_the_day_open() {
        // 10 shares, opened at $170, now $175: today's gain is $50.
        let holdings = vec![holding(
            "main",
            "AAPL",
            vec![Lot::new(d(2020, 1, 1), 10.0, 150.0)],
        )];
        let cache = cache_with(&[("AAPL", 175.0, 170.0)]);

        let mut options = opts();
        options.day_mode = true;
        let rows = aggregation_service::build_rows(&holdings, &cache, &options);
        let row = &rows[0];

        assert_eq!(row.ave_cost, 170.0);
        assert_eq!(row.gain_dollars, 50.0);
        assert!((row.gain_pct - 50.0 / 1700.0 * 100.0).abs() < 1e-9);
        // The cost column still reports the lot cost basis.
        assert_eq!(row.cost, 1500.0);
    }

    #[test]
    fn manual_priced_rows_show_zero_day_gain() {
        let mut lot = Lot::new(d(2024, 1, 1), 10.0, 10.0);
        lot.manual_price = Some(50.0);
        let holdings = vec![holding("main", "PRIV", vec![lot])];
        let cache = QuoteCache::new(300);

        let mut options = opts();
        options.day_mode = true;
        let rows = aggregation_service::build_rows(&holdings, &cache, &options);
        assert_eq!(rows[0].gain_dollars, 0.0);
        assert_eq!(rows[0].gain_pct, 0.0);
    }
}

mod statistics {
    use super::*;

    fn row(portfolio: &str, symbol: &str, cost: f64, gain: f64, qty: f64) -> PositionRow {
        PositionRow {
            portfolio: portfolio.to_string(),
            symbol: symbol.to_string(),
            description: String::new(),
            quantity: qty,
            ave_cost: if qty > 0.0 { cost / qty } else { 0.0 },
            price: 0.0,
            gain_pct: if cost > 0.0 { gain / cost * 100.0 } else { 0.0 },
            cost,
            gain_dollars: gain,
            value: cost + gain,
            is_fractional: false,
        }
    }

    #[test]
    fn empty_rows_yield_no_stats() {
        assert!(stats_service::compute(&[]).is_none());
    }

    #[test]
    fn total_gain_pct_is_cost_weighted() {
        // Row A: 100% on $100; row B: 10% on $1000.
        // Weighted total: 200/1100, not the 55% mean.
        let rows = vec![
            row("main", "A", 100.0, 100.0, 1.0),
            row("main", "B", 1000.0, 100.0, 1.0),
        ];
        let stats = stats_service::compute(&rows).unwrap();

        assert_eq!(stats.totals.cost, 1100.0);
        assert_eq!(stats.totals.gain_dollars, 200.0);
        assert!((stats.totals.gain_pct - 200.0 / 1100.0 * 100.0).abs() < 1e-9);
        assert!((stats.averages.gain_pct - 55.0).abs() < 1e-9);
    }

    #[test]
    fn averages_are_arithmetic_means() {
        let rows = vec![
            row("main", "A", 100.0, 50.0, 2.0),
            row("main", "B", 300.0, -50.0, 4.0),
        ];
        let stats = stats_service::compute(&rows).unwrap();

        assert_eq!(stats.averages.cost, 200.0);
        assert_eq!(stats.averages.gain_dollars, 0.0);
        assert_eq!(stats.averages.value, 200.0);
    }

    #[test]
    fn extreme_ties_keep_the_first_row_in_current_order() {
        let rows = vec![
            row("main", "FIRST", 500.0, 0.0, 3.0),
            row("main", "SECOND", 500.0, 0.0, 3.0),
        ];
        let stats = stats_service::compute(&rows).unwrap();

        for extremes in &stats.extremes {
            assert_eq!(extremes.min.symbol, "FIRST");
            assert_eq!(extremes.max.symbol, "FIRST");
        }
    }

    #[test]
    fn extremes_cover_all_five_columns() {
        let rows = vec![
            row("main", "SMALL", 100.0, -20.0, 1.0),
            row("main", "BIG", 900.0, 300.0, 9.0),
        ];
        let stats = stats_service::compute(&rows).unwrap();

        assert_eq!(stats.extremes.len(), 5);
        for extremes in &stats.extremes {
            assert_eq!(extremes.min.symbol, "SMALL");
            assert_eq!(extremes.max.symbol, "BIG");
        }
    }
}

mod sorting {
    use super::*;

    fn row(symbol: &str, value: f64, gain_pct: f64) -> PositionRow {
        PositionRow {
            portfolio: "main".to_string(),
            symbol: symbol.to_string(),
            description: String::new(),
            quantity: 1.0,
            ave_cost: 0.0,
            price: 0.0,
            gain_pct,
            cost: 0.0,
            gain_dollars: 0.0,
            value,
            is_fractional: false,
        }
    }

    fn symbols(rows: &[PositionRow]) -> Vec<&str> {
        rows.iter().map(|r| r.symbol.as_str()).collect()
    }

    #[test]
    fn default_order_is_symbol_ascending() {
        let (keys, fell_back) = sort::parse_keys(&[]);
        assert_eq!(keys, vec![SortKey::Symbol]);
        assert!(!fell_back);
    }

    #[test]
    fn invalid_key_falls_back_to_default_without_error() {
        let (keys, fell_back) = sort::parse_keys(&["valeu".to_string()]);
        assert_eq!(keys, vec![SortKey::Symbol]);
        assert!(fell_back);

        // Even a valid prefix before the bad key falls all the way back.
        let (keys, fell_back) =
            sort::parse_keys(&["value".to_string(), "nope".to_string()]);
        assert_eq!(keys, vec![SortKey::Symbol]);
        assert!(fell_back);
    }

    #[test]
    fn key_names_are_case_insensitive() {
        let (keys, fell_back) = sort::parse_keys(&["Gain_Pct".to_string()]);
        assert_eq!(keys, vec![SortKey::GainPct]);
        assert!(!fell_back);
    }

    #[test]
    fn single_key_sorts_ascending_by_default() {
        let mut rows = vec![row("B", 30.0, 0.0), row("A", 10.0, 0.0), row("C", 20.0, 0.0)];
        sort::sort_rows(&mut rows, &[SortKey::Value], false);
        assert_eq!(symbols(&rows), vec!["A", "C", "B"]);
    }

    #[test]
    fn descending_reverses_the_full_ordering() {
        let mut rows = vec![row("B", 30.0, 0.0), row("A", 10.0, 0.0), row("C", 20.0, 0.0)];
        sort::sort_rows(&mut rows, &[SortKey::Value], true);
        assert_eq!(symbols(&rows), vec!["B", "C", "A"]);
    }

    #[test]
    fn later_keys_break_ties_from_earlier_ones() {
        let mut rows = vec![
            row("X", 100.0, 5.0),
            row("Y", 100.0, 1.0),
            row("Z", 50.0, 9.0),
        ];
        sort::sort_rows(&mut rows, &[SortKey::Value, SortKey::GainPct], false);
        assert_eq!(symbols(&rows), vec!["Z", "Y", "X"]);
    }
}

mod lot_aging {
    use super::*;
    use lot_analysis::AgeBucket;

    #[test]
    fn age_buckets_partition_the_timeline() {
        assert_eq!(AgeBucket::of(0), AgeBucket::New);
        assert_eq!(AgeBucket::of(30), AgeBucket::New);
        assert_eq!(AgeBucket::of(31), AgeBucket::Recent);
        assert_eq!(AgeBucket::of(90), AgeBucket::Recent);
        assert_eq!(AgeBucket::of(91), AgeBucket::Medium);
        assert_eq!(AgeBucket::of(364), AgeBucket::Medium);
        assert_eq!(AgeBucket::of(365), AgeBucket::LongTerm);
        assert_eq!(AgeBucket::of(729), AgeBucket::LongTerm);
        assert_eq!(AgeBucket::of(730), AgeBucket::VeryLongTerm);
    }

    #[test]
    fn long_term_starts_at_one_year() {
        let today = d(2025, 1, 1);
        let lot = Lot::new(d(2024, 1, 1), 10.0, 100.0);
        let perf = lot_analysis::analyze_lot("AAPL", &lot, 0, Some(120.0), today);

        assert_eq!(perf.days_held, 366); // 2024 is a leap year
        assert!(perf.is_long_term());
        assert_eq!(perf.total_cost, 1000.0);
        assert_eq!(perf.current_value, Some(1200.0));
        assert_eq!(perf.gain_dollars, Some(200.0));
    }

    #[test]
    fn unpriced_lots_keep_age_metrics_only() {
        let today = d(2025, 1, 1);
        let lot = Lot::new(d(2024, 12, 1), 10.0, 100.0);
        let perf = lot_analysis::analyze_lot("PRIV", &lot, 0, None, today);

        assert_eq!(perf.days_held, 31);
        assert!(perf.current_value.is_none());
        assert!(perf.gain_pct.is_none());
        assert!(perf.annualized_return_pct.is_none());
    }

    #[test]
    fn metrics_split_long_and_short_term() {
        let today = d(2025, 6, 1);
        let old = lot_analysis::analyze_lot(
            "AAPL",
            &Lot::new(d(2022, 1, 1), 10.0, 100.0),
            0,
            Some(150.0),
            today,
        );
        let young = lot_analysis::analyze_lot(
            "AAPL",
            &Lot::new(d(2025, 5, 1), 10.0, 140.0),
            1,
            Some(150.0),
            today,
        );

        let metrics = lot_analysis::metrics(&[old, young]).unwrap();
        assert_eq!(metrics.total_lots, 2);
        assert_eq!(metrics.lots_with_prices, 2);
        assert_eq!(metrics.long_term_lots, 1);
        assert_eq!(metrics.short_term_lots, 1);
        assert_eq!(metrics.total_cost, 2400.0);
        assert_eq!(metrics.total_current_value, Some(3000.0));
    }

    #[test]
    fn metrics_of_nothing_is_none() {
        assert!(lot_analysis::metrics(&[]).is_none());
    }
}

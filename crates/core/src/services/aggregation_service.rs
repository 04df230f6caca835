use tracing::warn;

use crate::models::quote::{is_crypto, QuoteCache, ResolvedPrice};
use crate::models::position::PositionRow;
use crate::models::stock::Holding;

/// Options controlling which holdings are aggregated and how gains are
/// computed.
#[derive(Debug, Clone, Default)]
pub struct AggregationOptions {
    /// Include crypto symbols (excluded by default).
    pub include_crypto: bool,
    /// Include portfolios flagged `unvested` (excluded by default).
    pub include_unvested: bool,
    /// Day mode: gains are computed against the day's opening price rather
    /// than the lot cost basis: "how did today go", not "how has this
    /// position done since purchase".
    pub day_mode: bool,
    /// Truncation length for quote descriptions.
    pub max_description_length: usize,
    /// Explicitly configured crypto symbols (extends the suffix heuristic).
    pub crypto_symbols: Vec<String>,
}

/// Apply the inclusion policy to a flattened holding list.
pub fn filter_holdings(holdings: Vec<Holding>, opts: &AggregationOptions) -> Vec<Holding> {
    holdings
        .into_iter()
        .filter(|h| opts.include_crypto || !is_crypto(&h.symbol, &opts.crypto_symbols))
        .filter(|h| opts.include_unvested || !h.unvested)
        .collect()
}

/// Unique symbols across the filtered holdings, in first-seen order.
pub fn symbols_of(holdings: &[Holding]) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for h in holdings {
        if !symbols.contains(&h.symbol) {
            symbols.push(h.symbol.clone());
        }
    }
    symbols
}

/// Symbols where any lot carries a manual price override. These are never
/// fetched: the manual price wins whenever live data is non-positive or
/// unavailable.
pub fn manual_priced_symbols(holdings: &[Holding]) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for h in holdings {
        if h.lots.iter().any(|l| l.manual_price.is_some()) && !symbols.contains(&h.symbol) {
            symbols.push(h.symbol.clone());
        }
    }
    symbols
}

/// Resolve the display price for one holding: a positive quote price wins,
/// then the most-recently-added manual price, otherwise the holding is
/// excluded (with a warning) by returning `None`.
pub fn resolve_price(holding: &Holding, cache: &QuoteCache) -> Option<ResolvedPrice> {
    if let Some(quote) = cache.get(&holding.symbol) {
        if quote.current_price > 0.0 {
            return Some(ResolvedPrice::Fetched {
                price: quote.current_price,
                open: quote.open_price,
                description: quote.description.clone(),
            });
        }
    }
    holding.last_manual_price().map(ResolvedPrice::Manual)
}

/// Build position rows from filtered holdings and the quote cache.
///
/// Holdings with no resolvable price are excluded from the output entirely,
/// with an operator-visible warning.
pub fn build_rows(
    holdings: &[Holding],
    cache: &QuoteCache,
    opts: &AggregationOptions,
) -> Vec<PositionRow> {
    let mut rows = Vec::with_capacity(holdings.len());

    for holding in holdings {
        let Some(resolved) = resolve_price(holding, cache) else {
            warn!(
                "no price available for {} in {} (no quote, no manual price): skipping",
                holding.symbol, holding.portfolio
            );
            continue;
        };

        rows.push(build_row(holding, &resolved, opts));
    }

    rows
}

fn build_row(holding: &Holding, resolved: &ResolvedPrice, opts: &AggregationOptions) -> PositionRow {
    let quantity = holding.total_shares();
    let cost = holding.total_cost();
    let average_cost = holding.average_cost();
    let price = resolved.price();
    let value = quantity * price;

    // Day mode swaps the cost baseline for today's open; the Cost column
    // itself still reports the lot cost basis.
    let (ave_cost, baseline) = if opts.day_mode {
        let open = resolved.open();
        (open, quantity * open)
    } else {
        (average_cost, cost)
    };

    let gain_dollars = value - baseline;
    let gain_pct = percent_gain(gain_dollars, baseline);

    let description = resolved
        .description()
        .map(|d| truncate(d, opts.max_description_length))
        .unwrap_or_else(|| holding.description.clone());

    PositionRow {
        portfolio: holding.portfolio.clone(),
        symbol: holding.symbol.clone(),
        description,
        quantity,
        ave_cost,
        price,
        gain_pct,
        cost,
        gain_dollars,
        value,
        is_fractional: quantity.fract() != 0.0,
    }
}

/// Percent gain against a baseline. A zero baseline (promotional/zero-cost
/// lots) reports 100% for any positive gain and 0 otherwise: never a
/// division error or NaN.
fn percent_gain(gain: f64, baseline: f64) -> f64 {
    if baseline > 0.0 {
        gain / baseline * 100.0
    } else if gain > 0.0 {
        100.0
    } else {
        0.0
    }
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_len.saturating_sub(3)).collect();
    format!("{cut}...")
}

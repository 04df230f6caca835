use std::cmp::Ordering;
use std::str::FromStr;

use tracing::warn;

use crate::models::position::PositionRow;

/// Sortable columns of the position table.
///
/// `Ave` reads the row's `ave_cost` field, which already carries either the
/// average cost or the day-open price depending on the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Portfolio,
    Symbol,
    Description,
    Qty,
    Ave,
    Price,
    GainPct,
    Cost,
    GainDollars,
    Value,
}

impl FromStr for SortKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "portfolio" => Ok(SortKey::Portfolio),
            "symbol" => Ok(SortKey::Symbol),
            "description" => Ok(SortKey::Description),
            "qty" => Ok(SortKey::Qty),
            "ave" => Ok(SortKey::Ave),
            "price" => Ok(SortKey::Price),
            "gain_pct" => Ok(SortKey::GainPct),
            "cost" => Ok(SortKey::Cost),
            "gain_dollars" => Ok(SortKey::GainDollars),
            "value" => Ok(SortKey::Value),
            _ => Err(()),
        }
    }
}

/// The documented fallback ordering: ascending by symbol.
pub const DEFAULT_KEYS: [SortKey; 1] = [SortKey::Symbol];

/// Validate requested sort column names.
///
/// Any unknown key falls back to the fixed default ordering (symbol,
/// ascending) with a warning: never an error, and never a partial sort
/// from a half-valid spec.
pub fn parse_keys(specs: &[String]) -> (Vec<SortKey>, bool) {
    if specs.is_empty() {
        return (DEFAULT_KEYS.to_vec(), false);
    }

    let mut keys = Vec::with_capacity(specs.len());
    for spec in specs {
        match SortKey::from_str(spec) {
            Ok(key) => keys.push(key),
            Err(()) => {
                warn!(
                    "invalid sort column '{spec}': valid columns: portfolio, symbol, \
                     description, qty, ave, price, gain_pct, cost, gain_dollars, value; \
                     using default (symbol, ascending)"
                );
                return (DEFAULT_KEYS.to_vec(), true);
            }
        }
    }
    (keys, false)
}

/// Apply a multi-key ordering; later keys break ties from earlier ones.
pub fn sort_rows(rows: &mut [PositionRow], keys: &[SortKey], descending: bool) {
    rows.sort_by(|a, b| {
        let mut ord = Ordering::Equal;
        for &key in keys {
            ord = compare(a, b, key);
            if ord != Ordering::Equal {
                break;
            }
        }
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
}

fn compare(a: &PositionRow, b: &PositionRow, key: SortKey) -> Ordering {
    match key {
        SortKey::Portfolio => a.portfolio.cmp(&b.portfolio),
        SortKey::Symbol => a.symbol.cmp(&b.symbol),
        SortKey::Description => a.description.cmp(&b.description),
        SortKey::Qty => total_cmp(a.quantity, b.quantity),
        SortKey::Ave => total_cmp(a.ave_cost, b.ave_cost),
        SortKey::Price => total_cmp(a.price, b.price),
        SortKey::GainPct => total_cmp(a.gain_pct, b.gain_pct),
        SortKey::Cost => total_cmp(a.cost, b.cost),
        SortKey::GainDollars => total_cmp(a.gain_dollars, b.gain_dollars),
        SortKey::Value => total_cmp(a.value, b.value),
    }
}

fn total_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

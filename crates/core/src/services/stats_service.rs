use crate::models::position::PositionRow;
use crate::models::stats::{
    Averages, ColumnExtremes, Extreme, PortfolioStats, StatColumn, Totals,
};

/// Reduce a position table to totals, averages, and per-column extremes.
///
/// Tie-break rule: when several rows share an extreme value, the first row
/// in the *current* row order wins. Statistics are therefore dependent on
/// the sort applied before calling this: deliberate, preserved behavior,
/// covered by tests.
pub fn compute(rows: &[PositionRow]) -> Option<PortfolioStats> {
    if rows.is_empty() {
        return None;
    }

    let n = rows.len() as f64;
    let sum_cost: f64 = rows.iter().map(|r| r.cost).sum();
    let sum_gain: f64 = rows.iter().map(|r| r.gain_dollars).sum();
    let sum_value: f64 = rows.iter().map(|r| r.value).sum();
    let sum_gain_pct: f64 = rows.iter().map(|r| r.gain_pct).sum();

    let totals = Totals {
        cost: sum_cost,
        gain_dollars: sum_gain,
        value: sum_value,
        // Cost-weighted aggregate, not the mean of per-row percentages.
        gain_pct: if sum_cost > 0.0 {
            sum_gain / sum_cost * 100.0
        } else {
            0.0
        },
    };

    let averages = Averages {
        gain_pct: sum_gain_pct / n,
        cost: sum_cost / n,
        gain_dollars: sum_gain / n,
        value: sum_value / n,
    };

    let extremes = StatColumn::ALL
        .iter()
        .map(|&column| column_extremes(rows, column))
        .collect();

    Some(PortfolioStats {
        totals,
        averages,
        extremes,
    })
}

fn column_value(row: &PositionRow, column: StatColumn) -> f64 {
    match column {
        StatColumn::Value => row.value,
        StatColumn::GainDollars => row.gain_dollars,
        StatColumn::GainPct => row.gain_pct,
        StatColumn::Cost => row.cost,
        StatColumn::Qty => row.quantity,
    }
}

fn column_extremes(rows: &[PositionRow], column: StatColumn) -> ColumnExtremes {
    // Strict comparisons keep the first-encountered row on ties.
    let mut min = &rows[0];
    let mut max = &rows[0];

    for row in &rows[1..] {
        if column_value(row, column) < column_value(min, column) {
            min = row;
        }
        if column_value(row, column) > column_value(max, column) {
            max = row;
        }
    }

    ColumnExtremes {
        column,
        min: extreme_of(min, column),
        max: extreme_of(max, column),
    }
}

fn extreme_of(row: &PositionRow, column: StatColumn) -> Extreme {
    Extreme {
        portfolio: row.portfolio.clone(),
        symbol: row.symbol.clone(),
        value: column_value(row, column),
    }
}

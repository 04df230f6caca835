/// Columns that carry min/max statistics, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatColumn {
    Value,
    GainDollars,
    GainPct,
    Cost,
    Qty,
}

impl StatColumn {
    pub const ALL: [StatColumn; 5] = [
        StatColumn::Value,
        StatColumn::GainDollars,
        StatColumn::GainPct,
        StatColumn::Cost,
        StatColumn::Qty,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StatColumn::Value => "Value",
            StatColumn::GainDollars => "Gain$",
            StatColumn::GainPct => "Gain%",
            StatColumn::Cost => "Cost",
            StatColumn::Qty => "Qty",
        }
    }
}

/// An extreme (min or max) value together with the row that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extreme {
    pub portfolio: String,
    pub symbol: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnExtremes {
    pub column: StatColumn,
    pub min: Extreme,
    pub max: Extreme,
}

/// Column sums across all rows. `gain_pct` is the cost-weighted aggregate
/// `Σgain / Σcost × 100`, NOT the mean of per-row percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct Totals {
    pub cost: f64,
    pub gain_dollars: f64,
    pub value: f64,
    pub gain_pct: f64,
}

/// Simple arithmetic means per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Averages {
    pub gain_pct: f64,
    pub cost: f64,
    pub gain_dollars: f64,
    pub value: f64,
}

/// Full reduction of a position table.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioStats {
    pub totals: Totals,
    pub averages: Averages,
    pub extremes: Vec<ColumnExtremes>,
}

use serde::Serialize;

/// One aggregated `(portfolio, symbol)` row, derived fresh on every run and
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionRow {
    pub portfolio: String,
    pub symbol: String,
    pub description: String,

    /// Total shares across all lots.
    pub quantity: f64,

    /// Average cost per share, or the day's opening price in day mode.
    pub ave_cost: f64,

    pub price: f64,
    pub gain_pct: f64,

    /// Total cost basis across all lots.
    pub cost: f64,

    pub gain_dollars: f64,
    pub value: f64,

    /// Whether `quantity` has a fractional component. A data-model-level
    /// fact; the display layer appends a marker for fractional rows.
    pub is_fractional: bool,
}

impl PositionRow {
    /// Column headers in display/CSV order. The cost column is labelled
    /// `Day$` in day mode, `Ave$` otherwise.
    pub fn headers(day_mode: bool) -> [&'static str; 10] {
        [
            "Portfolio",
            "Symbol",
            "Description",
            "Qty",
            if day_mode { "Day$" } else { "Ave$" },
            "Price",
            "Gain%",
            "Cost",
            "Gain$",
            "Value",
        ]
    }
}

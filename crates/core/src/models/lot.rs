use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single purchase event: on `date`, `shares` units were bought at
/// `cost_basis` per share.
///
/// Lots are immutable once created; edits go through the explicit CRUD
/// operations on the portfolio store. `shares > 0` is recommended but not
/// enforced; `cost_basis` may be 0 (promotional/grant shares).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    /// Purchase date (daily granularity, serialized as YYYY-MM-DD).
    pub date: NaiveDate,

    /// Number of shares bought (fractional quantities allowed).
    pub shares: f64,

    /// Price paid per share at purchase.
    pub cost_basis: f64,

    /// User-supplied price override, used when live market data is
    /// unavailable for the symbol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_price: Option<f64>,
}

impl Lot {
    pub fn new(date: NaiveDate, shares: f64, cost_basis: f64) -> Self {
        Self {
            date,
            shares,
            cost_basis,
            manual_price: None,
        }
    }

    /// Total amount paid for this lot.
    pub fn total_cost(&self) -> f64 {
        self.shares * self.cost_basis
    }
}

use serde::{Deserialize, Serialize};

use super::lot::Lot;

/// All purchase lots for one symbol within one portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEntry {
    /// Display name from the portfolio file (a fetched quote description
    /// takes precedence at render time).
    #[serde(default)]
    pub description: String,

    /// Free-text notes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,

    /// Purchase lots, kept newest-date-first for display.
    pub lots: Vec<Lot>,
}

impl StockEntry {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            notes: String::new(),
            lots: Vec::new(),
        }
    }

    /// Re-establish the newest-date-first lot order.
    pub fn sort_lots(&mut self) {
        self.lots.sort_by(|a, b| b.date.cmp(&a.date));
    }

    pub fn total_shares(&self) -> f64 {
        self.lots.iter().map(|l| l.shares).sum()
    }

    pub fn total_cost(&self) -> f64 {
        self.lots.iter().map(Lot::total_cost).sum()
    }

    /// The most recently *added* manual price, by lot list order (not by
    /// purchase date).
    pub fn last_manual_price(&self) -> Option<f64> {
        self.lots.iter().rev().find_map(|l| l.manual_price)
    }
}

/// A flattened `(portfolio, symbol)` position, the unit of aggregation.
/// The same symbol held in two portfolios is two distinct holdings.
#[derive(Debug, Clone)]
pub struct Holding {
    pub portfolio: String,
    pub symbol: String,
    pub description: String,
    pub notes: String,
    /// Carried over from the owning portfolio's `unvested` flag.
    pub unvested: bool,
    pub lots: Vec<Lot>,
}

impl Holding {
    pub fn total_shares(&self) -> f64 {
        self.lots.iter().map(|l| l.shares).sum()
    }

    pub fn total_cost(&self) -> f64 {
        self.lots.iter().map(Lot::total_cost).sum()
    }

    /// Weighted average cost per share; 0 when no shares are held.
    pub fn average_cost(&self) -> f64 {
        let shares = self.total_shares();
        if shares > 0.0 {
            self.total_cost() / shares
        } else {
            0.0
        }
    }

    pub fn last_manual_price(&self) -> Option<f64> {
        self.lots.iter().rev().find_map(|l| l.manual_price)
    }
}

use chrono::NaiveDate;

use crate::models::lot::Lot;
use crate::models::stock::Holding;

/// Holding period after which a lot counts as long-term (one year).
const LONG_TERM_THRESHOLD_DAYS: i64 = 365;

/// Performance metrics for a single lot.
///
/// The value/gain fields are `None` when no current price is available;
/// age metrics still work offline.
#[derive(Debug, Clone, PartialEq)]
pub struct LotPerformance {
    pub symbol: String,
    pub lot_index: usize,
    pub purchase_date: NaiveDate,
    pub shares: f64,
    pub cost_basis: f64,
    pub days_held: i64,
    pub years_held: f64,
    pub total_cost: f64,
    pub current_value: Option<f64>,
    pub gain_dollars: Option<f64>,
    pub gain_pct: Option<f64>,
    pub annualized_return_pct: Option<f64>,
}

impl LotPerformance {
    pub fn is_long_term(&self) -> bool {
        self.days_held >= LONG_TERM_THRESHOLD_DAYS
    }
}

/// Age buckets for the lot aging timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBucket {
    /// 0–30 days
    New,
    /// 31–90 days
    Recent,
    /// 91–364 days
    Medium,
    /// 1–2 years
    LongTerm,
    /// 2+ years
    VeryLongTerm,
}

impl AgeBucket {
    pub fn of(days_held: i64) -> Self {
        match days_held {
            d if d <= 30 => AgeBucket::New,
            d if d <= 90 => AgeBucket::Recent,
            d if d < 365 => AgeBucket::Medium,
            d if d < 730 => AgeBucket::LongTerm,
            _ => AgeBucket::VeryLongTerm,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBucket::New => "0-30 days",
            AgeBucket::Recent => "31-90 days",
            AgeBucket::Medium => "91-365 days",
            AgeBucket::LongTerm => "1-2 years",
            AgeBucket::VeryLongTerm => "2+ years",
        }
    }
}

/// Aggregate metrics over a set of analyzed lots.
#[derive(Debug, Clone, PartialEq)]
pub struct LotMetrics {
    pub total_lots: usize,
    pub lots_with_prices: usize,
    pub total_cost: f64,
    pub total_current_value: Option<f64>,
    pub total_gain_dollars: Option<f64>,
    pub total_gain_pct: Option<f64>,
    pub avg_days_held: f64,
    pub long_term_lots: usize,
    pub short_term_lots: usize,
}

/// Analyze one lot against an optional current price, as of `today`.
pub fn analyze_lot(
    symbol: &str,
    lot: &Lot,
    lot_index: usize,
    current_price: Option<f64>,
    today: NaiveDate,
) -> LotPerformance {
    let days_held = (today - lot.date).num_days();
    let years_held = days_held as f64 / 365.25;
    let total_cost = lot.total_cost();

    let current_value = current_price.map(|p| lot.shares * p);
    let gain_dollars = current_value.map(|v| v - total_cost);
    let gain_pct = gain_dollars.map(|g| {
        if total_cost > 0.0 {
            g / total_cost * 100.0
        } else {
            0.0
        }
    });
    let annualized_return_pct = current_value.and_then(|v| {
        if years_held > 0.0 && total_cost > 0.0 {
            Some(((v / total_cost).powf(1.0 / years_held) - 1.0) * 100.0)
        } else {
            None
        }
    });

    LotPerformance {
        symbol: symbol.to_string(),
        lot_index,
        purchase_date: lot.date,
        shares: lot.shares,
        cost_basis: lot.cost_basis,
        days_held,
        years_held,
        total_cost,
        current_value,
        gain_dollars,
        gain_pct,
        annualized_return_pct,
    }
}

/// Analyze every lot of a holding.
pub fn analyze_holding(
    holding: &Holding,
    current_price: Option<f64>,
    today: NaiveDate,
) -> Vec<LotPerformance> {
    holding
        .lots
        .iter()
        .enumerate()
        .map(|(i, lot)| analyze_lot(&holding.symbol, lot, i, current_price, today))
        .collect()
}

/// Reduce analyzed lots to portfolio-level metrics.
pub fn metrics(lots: &[LotPerformance]) -> Option<LotMetrics> {
    if lots.is_empty() {
        return None;
    }

    let total_lots = lots.len();
    let priced: Vec<&LotPerformance> = lots.iter().filter(|l| l.current_value.is_some()).collect();
    let total_cost: f64 = lots.iter().map(|l| l.total_cost).sum();

    let (total_current_value, total_gain_dollars, total_gain_pct) = if priced.is_empty() {
        (None, None, None)
    } else {
        let value: f64 = priced.iter().filter_map(|l| l.current_value).sum();
        let gain: f64 = priced.iter().filter_map(|l| l.gain_dollars).sum();
        let pct = if total_cost > 0.0 {
            gain / total_cost * 100.0
        } else {
            0.0
        };
        (Some(value), Some(gain), Some(pct))
    };

    let avg_days_held = lots.iter().map(|l| l.days_held).sum::<i64>() as f64 / total_lots as f64;
    let long_term_lots = lots.iter().filter(|l| l.is_long_term()).count();

    Some(LotMetrics {
        total_lots,
        lots_with_prices: priced.len(),
        total_cost,
        total_current_value,
        total_gain_dollars,
        total_gain_pct,
        avg_days_held,
        long_term_lots,
        short_term_lots: total_lots - long_term_lots,
    })
}

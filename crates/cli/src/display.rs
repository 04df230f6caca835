use std::time::Duration;

use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use stock_tracker_core::config::{CurrencyConfig, DisplayConfig, NegativeFormat};
use stock_tracker_core::models::position::PositionRow;
use stock_tracker_core::models::stats::{PortfolioStats, Totals};
use stock_tracker_core::services::lot_analysis::{AgeBucket, LotMetrics, LotPerformance};

// ── Value formatting ────────────────────────────────────────────────

/// Format a currency amount per config: thousands grouping, optional `$`,
/// negatives as parentheses or a leading minus.
pub fn currency(value: f64, cfg: &CurrencyConfig) -> String {
    let magnitude = grouped(value.abs(), cfg.decimal_places);
    let symbol = if cfg.show_symbol { "$" } else { "" };
    if value < 0.0 {
        match cfg.negative_format {
            NegativeFormat::Parentheses => format!("({symbol}{magnitude})"),
            NegativeFormat::Minus => format!("-{symbol}{magnitude}"),
        }
    } else {
        format!("{symbol}{magnitude}")
    }
}

pub fn percent(value: f64) -> String {
    format!("{value:.2}%")
}

/// Quantities print whole when whole; fractional quantities keep their
/// decimals and carry a trailing `*` marker.
pub fn quantity(qty: f64, fractional: bool) -> String {
    if fractional {
        let text = format!("{qty:.4}");
        let text = text.trim_end_matches('0').trim_end_matches('.');
        format!("{text}*")
    } else {
        format!("{qty:.0}")
    }
}

/// Color a formatted value by the sign of `gain` when coloring is on.
pub fn paint(text: String, gain: f64, colored: bool) -> String {
    if !colored || gain == 0.0 {
        return text;
    }
    if gain > 0.0 {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

fn grouped(value: f64, places: usize) -> String {
    let text = format!("{value:.places$}");
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut out = String::with_capacity(text.len() + int_part.len() / 3);
    let digits = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    match frac_part {
        Some(f) => format!("{out}.{f}"),
        None => out,
    }
}

// ── Tables ──────────────────────────────────────────────────────────

fn base_table(display: &DisplayConfig, width: Option<u16>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic);
    if display.stretch_to_terminal || width.is_some() {
        table.set_width(width.unwrap_or(display.terminal_width));
    }
    table
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Render the position table, with an optional totals row at the bottom.
pub fn position_table(
    rows: &[PositionRow],
    totals: Option<&Totals>,
    day_mode: bool,
    display: &DisplayConfig,
    cur: &CurrencyConfig,
    width: Option<u16>,
) -> Table {
    let mut table = base_table(display, width);
    table.set_header(PositionRow::headers(day_mode).to_vec());

    for row in rows {
        table.add_row(vec![
            Cell::new(&row.portfolio),
            Cell::new(&row.symbol),
            Cell::new(&row.description),
            right(quantity(row.quantity, row.is_fractional)),
            right(currency(row.ave_cost, cur)),
            right(currency(row.price, cur)),
            right(paint(
                percent(row.gain_pct),
                row.gain_dollars,
                cur.colored_mode,
            )),
            right(currency(row.cost, cur)),
            right(paint(
                currency(row.gain_dollars, cur),
                row.gain_dollars,
                cur.colored_mode,
            )),
            right(currency(row.value, cur)),
        ]);
    }

    if let Some(totals) = totals {
        table.add_row(vec![
            Cell::new("TOTAL"),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            right(paint(
                percent(totals.gain_pct),
                totals.gain_dollars,
                cur.colored_mode,
            )),
            right(currency(totals.cost, cur)),
            right(paint(
                currency(totals.gain_dollars, cur),
                totals.gain_dollars,
                cur.colored_mode,
            )),
            right(currency(totals.value, cur)),
        ]);
    }

    table
}

/// Render the statistics report: totals and averages side by side, then
/// per-column extremes with the rows that own them.
pub fn stats_tables(
    stats: &PortfolioStats,
    display: &DisplayConfig,
    cur: &CurrencyConfig,
) -> (Table, Table) {
    let mut summary = base_table(display, None);
    summary.set_header(vec!["", "Cost", "Gain$", "Gain%", "Value"]);
    summary.add_row(vec![
        Cell::new("Total"),
        right(currency(stats.totals.cost, cur)),
        right(paint(
            currency(stats.totals.gain_dollars, cur),
            stats.totals.gain_dollars,
            cur.colored_mode,
        )),
        right(percent(stats.totals.gain_pct)),
        right(currency(stats.totals.value, cur)),
    ]);
    summary.add_row(vec![
        Cell::new("Average"),
        right(currency(stats.averages.cost, cur)),
        right(paint(
            currency(stats.averages.gain_dollars, cur),
            stats.averages.gain_dollars,
            cur.colored_mode,
        )),
        right(percent(stats.averages.gain_pct)),
        right(currency(stats.averages.value, cur)),
    ]);

    let mut extremes = base_table(display, None);
    extremes.set_header(vec!["Column", "Min", "Min holding", "Max", "Max holding"]);
    for ex in &stats.extremes {
        extremes.add_row(vec![
            Cell::new(ex.column.label()),
            right(format!("{:.2}", ex.min.value)),
            Cell::new(format!("{}/{}", ex.min.portfolio, ex.min.symbol)),
            right(format!("{:.2}", ex.max.value)),
            Cell::new(format!("{}/{}", ex.max.portfolio, ex.max.symbol)),
        ]);
    }

    (summary, extremes)
}

/// Render per-lot performance for the `lots` command.
pub fn lots_table(
    lots: &[LotPerformance],
    display: &DisplayConfig,
    cur: &CurrencyConfig,
) -> Table {
    let mut table = base_table(display, None);
    table.set_header(vec![
        "Symbol", "#", "Date", "Shares", "Cost/Sh", "Cost", "Value", "Gain$", "Gain%", "Ann%",
        "Held", "Age",
    ]);

    for lot in lots {
        let gain = lot.gain_dollars.unwrap_or(0.0);
        table.add_row(vec![
            Cell::new(&lot.symbol),
            right(lot.lot_index.to_string()),
            Cell::new(lot.purchase_date.format("%Y-%m-%d").to_string()),
            right(quantity(lot.shares, lot.shares.fract() != 0.0)),
            right(currency(lot.cost_basis, cur)),
            right(currency(lot.total_cost, cur)),
            right(opt_currency(lot.current_value, cur)),
            right(paint(
                opt_currency(lot.gain_dollars, cur),
                gain,
                cur.colored_mode,
            )),
            right(opt_percent(lot.gain_pct)),
            right(opt_percent(lot.annualized_return_pct)),
            right(format!("{}d", lot.days_held)),
            Cell::new(AgeBucket::of(lot.days_held).label()),
        ]);
    }

    table
}

pub fn lot_metrics_lines(metrics: &LotMetrics, cur: &CurrencyConfig) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{} lots ({} priced), total cost {}",
            metrics.total_lots,
            metrics.lots_with_prices,
            currency(metrics.total_cost, cur)
        ),
        format!(
            "average holding period {:.0} days; {} long-term, {} short-term",
            metrics.avg_days_held, metrics.long_term_lots, metrics.short_term_lots
        ),
    ];
    if let (Some(value), Some(gain), Some(pct)) = (
        metrics.total_current_value,
        metrics.total_gain_dollars,
        metrics.total_gain_pct,
    ) {
        lines.push(format!(
            "current value {}, unrealized {} ({})",
            currency(value, cur),
            paint(currency(gain, cur), gain, cur.colored_mode),
            percent(pct)
        ));
    }
    lines
}

fn opt_currency(value: Option<f64>, cur: &CurrencyConfig) -> String {
    value.map_or_else(|| "-".to_string(), |v| currency(v, cur))
}

fn opt_percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), percent)
}

// ── Spinner ─────────────────────────────────────────────────────────

/// Cosmetic fetch spinner. Callers must `finish_and_clear` before printing
/// any output.
pub fn fetch_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Refreshing quotes...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

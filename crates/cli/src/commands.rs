use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::{ContentArrangement, Table};

use stock_tracker_core::config::AppConfig;
use stock_tracker_core::models::lot::Lot;
use stock_tracker_core::services::aggregation_service::{self, AggregationOptions};
use stock_tracker_core::services::lot_analysis;
use stock_tracker_core::storage::portfolio_store::LotUpdate;
use stock_tracker_core::StockTracker;

use crate::cli::{
    Cli, Commands, FilterArgs, LotCommands, PortfolioCommands, SortArgs, SymbolCommands,
};
use crate::display;

pub async fn run(args: Cli) -> Result<()> {
    let config = AppConfig::load(&args.config)?;
    let mut tracker = StockTracker::new(config.clone());

    // `portfolio create` may legitimately run before the portfolios
    // directory exists; everything else needs it.
    match &args.command {
        Commands::Portfolio {
            command: PortfolioCommands::Create { .. },
        } => {
            let _ = tracker.load_portfolios();
        }
        _ => tracker.load_portfolios()?,
    }

    match args.command {
        Commands::Show {
            portfolios,
            filters,
            sorting,
            no_totals,
            width,
        } => show(&mut tracker, &config, portfolios, filters, sorting, no_totals, width).await,
        Commands::List => list(&tracker),
        Commands::Stats { filters } => stats(&mut tracker, &config, filters).await,
        Commands::Export {
            file,
            filters,
            sorting,
        } => export(&mut tracker, &config, &file, filters, sorting).await,
        Commands::Lots {
            portfolio,
            symbol,
            filters,
        } => lots(&mut tracker, &config, &portfolio, symbol, filters).await,
        Commands::Lot { command } => lot_crud(&mut tracker, command),
        Commands::Symbol { command } => symbol_crud(&mut tracker, command),
        Commands::Portfolio { command } => portfolio_crud(&mut tracker, command),
    }
}

// ── Read commands ───────────────────────────────────────────────────

async fn show(
    tracker: &mut StockTracker,
    config: &AppConfig,
    portfolios: Vec<String>,
    filters: FilterArgs,
    sorting: SortArgs,
    no_totals: bool,
    width: Option<u16>,
) -> Result<()> {
    let selected = selected_portfolios(tracker, &portfolios)?;
    let opts = options(config, &filters);
    refresh(tracker, &opts, filters.live).await;

    let (specs, descending) = sort_specs(config, &sorting);
    let mut rows = tracker.positions(&opts, &specs, descending);
    if let Some(names) = &selected {
        rows.retain(|r| names.contains(&r.portfolio));
    }

    if rows.is_empty() {
        println!("No positions to display.");
        return Ok(());
    }

    let totals = if no_totals {
        None
    } else {
        tracker.stats(&rows).map(|s| s.totals)
    };
    let table = display::position_table(
        &rows,
        totals.as_ref(),
        opts.day_mode,
        &config.display,
        &config.currency,
        width,
    );
    println!("{table}");
    Ok(())
}

fn list(tracker: &StockTracker) -> Result<()> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Portfolio", "Description", "Symbols", "Lots", "Flags"]);

    for portfolio in tracker.store().portfolios() {
        let lots: usize = portfolio.stocks.values().map(|s| s.lots.len()).sum();
        table.add_row(vec![
            portfolio.name.clone(),
            portfolio.description.clone().unwrap_or_default(),
            portfolio.stocks.len().to_string(),
            lots.to_string(),
            if portfolio.unvested {
                "unvested".to_string()
            } else {
                String::new()
            },
        ]);
    }

    println!("{table}");
    Ok(())
}

async fn stats(tracker: &mut StockTracker, config: &AppConfig, filters: FilterArgs) -> Result<()> {
    let opts = options(config, &filters);
    refresh(tracker, &opts, filters.live).await;

    let rows = tracker.positions(&opts, &[config.display.default_sort_column.clone()], false);
    let Some(stats) = tracker.stats(&rows) else {
        println!("No positions to report on.");
        return Ok(());
    };

    let (summary, extremes) = display::stats_tables(&stats, &config.display, &config.currency);
    println!("{summary}");
    println!("{extremes}");
    Ok(())
}

async fn export(
    tracker: &mut StockTracker,
    config: &AppConfig,
    file: &std::path::Path,
    filters: FilterArgs,
    sorting: SortArgs,
) -> Result<()> {
    use stock_tracker_core::models::position::PositionRow;

    let opts = options(config, &filters);
    refresh(tracker, &opts, filters.live).await;

    let (specs, descending) = sort_specs(config, &sorting);
    let rows = tracker.positions(&opts, &specs, descending);

    let mut writer = csv::Writer::from_path(file)
        .with_context(|| format!("cannot create {}", file.display()))?;
    writer.write_record(PositionRow::headers(opts.day_mode))?;
    for row in &rows {
        writer.write_record(&[
            row.portfolio.clone(),
            row.symbol.clone(),
            row.description.clone(),
            row.quantity.to_string(),
            format!("{:.2}", row.ave_cost),
            format!("{:.2}", row.price),
            format!("{:.2}", row.gain_pct),
            format!("{:.2}", row.cost),
            format!("{:.2}", row.gain_dollars),
            format!("{:.2}", row.value),
        ])?;
    }
    writer.flush()?;

    println!("Exported {} position(s) to {}", rows.len(), file.display());
    Ok(())
}

async fn lots(
    tracker: &mut StockTracker,
    config: &AppConfig,
    portfolio: &str,
    symbol: Option<String>,
    filters: FilterArgs,
) -> Result<()> {
    if tracker.store().get(portfolio).is_none() {
        bail!("portfolio '{portfolio}' not found");
    }

    let opts = options(config, &filters);
    refresh(tracker, &opts, filters.live).await;

    let mut holdings = tracker.holdings(&opts);
    holdings.retain(|h| h.portfolio == portfolio);
    if let Some(symbol) = &symbol {
        let symbol = symbol.to_uppercase();
        holdings.retain(|h| h.symbol == symbol);
        if holdings.is_empty() {
            bail!("symbol {symbol} not found in portfolio '{portfolio}' (or filtered out)");
        }
    }

    let today = Local::now().date_naive();
    let mut performances = Vec::new();
    for holding in &holdings {
        let price = aggregation_service::resolve_price(holding, tracker.cache()).map(|r| r.price());
        performances.extend(lot_analysis::analyze_holding(holding, price, today));
    }

    if performances.is_empty() {
        println!("No lots to display.");
        return Ok(());
    }

    let table = display::lots_table(&performances, &config.display, &config.currency);
    println!("{table}");

    if let Some(metrics) = tracker.lot_metrics(&performances) {
        for line in display::lot_metrics_lines(&metrics, &config.currency) {
            println!("{line}");
        }
    }
    Ok(())
}

// ── CRUD commands ───────────────────────────────────────────────────

fn lot_crud(tracker: &mut StockTracker, command: LotCommands) -> Result<()> {
    match command {
        LotCommands::Add {
            portfolio,
            symbol,
            date,
            shares,
            cost,
            manual_price,
        } => {
            let mut lot = Lot::new(parse_date(&date)?, shares, cost);
            lot.manual_price = manual_price;
            tracker.add_lot(&portfolio, &symbol, lot)?;
            println!("Added lot to {}/{}: {shares} @ {cost}", portfolio, symbol.to_uppercase());
        }
        LotCommands::Remove {
            portfolio,
            symbol,
            index,
        } => {
            tracker.remove_lot(&portfolio, &symbol, index)?;
            println!("Removed lot {index} from {}/{}", portfolio, symbol.to_uppercase());
        }
        LotCommands::Update {
            portfolio,
            symbol,
            index,
            date,
            shares,
            cost,
            manual_price,
            clear_manual_price,
        } => {
            let update = LotUpdate {
                date: date.as_deref().map(parse_date).transpose()?,
                shares,
                cost_basis: cost,
                manual_price: if clear_manual_price {
                    Some(None)
                } else {
                    manual_price.map(Some)
                },
            };
            tracker.update_lot(&portfolio, &symbol, index, update)?;
            println!("Updated lot {index} of {}/{}", portfolio, symbol.to_uppercase());
        }
    }
    Ok(())
}

fn symbol_crud(tracker: &mut StockTracker, command: SymbolCommands) -> Result<()> {
    match command {
        SymbolCommands::Add {
            portfolio,
            symbol,
            description,
        } => {
            tracker.add_symbol(&portfolio, &symbol, &description)?;
            println!(
                "Added {} to '{portfolio}': add a purchase with `stocks lot add`",
                symbol.to_uppercase()
            );
        }
        SymbolCommands::Remove { portfolio, symbol } => {
            tracker.remove_symbol(&portfolio, &symbol)?;
            println!("Removed {} from '{portfolio}'", symbol.to_uppercase());
        }
    }
    Ok(())
}

fn portfolio_crud(tracker: &mut StockTracker, command: PortfolioCommands) -> Result<()> {
    match command {
        PortfolioCommands::Create { name } => {
            tracker.create_portfolio(&name)?;
            println!("Created portfolio '{name}'");
        }
        PortfolioCommands::Delete { name } => {
            tracker.delete_portfolio(&name)?;
            println!("Deleted portfolio '{name}'");
        }
        PortfolioCommands::Backup { name } => {
            let backup = tracker.backup_portfolio(&name)?;
            println!("Backed up '{name}' to {}", backup.display());
        }
        PortfolioCommands::Restore { name } => {
            tracker.restore_portfolio(&name)?;
            println!("Restored '{name}' from backup");
        }
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────

fn options(config: &AppConfig, filters: &FilterArgs) -> AggregationOptions {
    AggregationOptions {
        include_crypto: filters.crypto,
        include_unvested: filters.unvested,
        day_mode: filters.day,
        max_description_length: config.display.max_description_length,
        crypto_symbols: config.portfolio.crypto_symbols.clone(),
    }
}

/// Resolve the requested sort columns, falling back to the configured
/// default. Descending comes from `--desc` or, when no explicit sort is
/// given, from config.
fn sort_specs(config: &AppConfig, sorting: &SortArgs) -> (Vec<String>, bool) {
    if sorting.sort.is_empty() {
        (
            vec![config.display.default_sort_column.clone()],
            sorting.desc || config.display.default_sort_descending,
        )
    } else {
        (sorting.sort.clone(), sorting.desc)
    }
}

/// Validate the portfolio selection: `None` means all, otherwise every
/// named portfolio must exist.
fn selected_portfolios(
    tracker: &StockTracker,
    requested: &[String],
) -> Result<Option<Vec<String>>> {
    if requested.is_empty() || requested.iter().any(|name| name == "ALL") {
        return Ok(None);
    }
    for name in requested {
        if tracker.store().get(name).is_none() {
            bail!(
                "portfolio '{name}' not found (available: {})",
                tracker.portfolio_names().join(", ")
            );
        }
    }
    Ok(Some(requested.to_vec()))
}

async fn refresh(tracker: &mut StockTracker, opts: &AggregationOptions, live: bool) {
    let spinner = display::fetch_spinner();
    let summary = tracker.refresh_quotes(opts, live).await;
    spinner.finish_and_clear();
    if summary.missing > 0 {
        tracing::warn!("{} symbol(s) have no quote available", summary.missing);
    }
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{text}': expected YYYY-MM-DD"))
}

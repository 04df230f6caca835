use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Personal stock and crypto portfolio tracker.
#[derive(Debug, Parser)]
#[command(name = "stocks", version, about)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "conf/config.yaml")]
    pub config: PathBuf,

    /// Increase log verbosity (-v: info, -vv: debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the position table for one, several, or all portfolios.
    Show {
        /// Portfolio names; empty or "ALL" means every portfolio.
        portfolios: Vec<String>,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        sorting: SortArgs,

        /// Suppress the totals row.
        #[arg(long)]
        no_totals: bool,

        /// Override the table width from config.
        #[arg(long)]
        width: Option<u16>,
    },

    /// List portfolios with their symbol and lot counts.
    List,

    /// Portfolio statistics: totals, averages, and per-column extremes.
    Stats {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Export the position table to a CSV file.
    Export {
        /// Output file path.
        file: PathBuf,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        sorting: SortArgs,
    },

    /// Per-lot performance and aging for one portfolio.
    Lots {
        portfolio: String,

        /// Restrict to a single symbol.
        symbol: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Manage purchase lots.
    Lot {
        #[command(subcommand)]
        command: LotCommands,
    },

    /// Manage symbols within a portfolio.
    Symbol {
        #[command(subcommand)]
        command: SymbolCommands,
    },

    /// Manage portfolio files.
    Portfolio {
        #[command(subcommand)]
        command: PortfolioCommands,
    },
}

/// Holding filters shared by the read commands.
#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Force a fresh fetch, ignoring cached quotes.
    #[arg(long)]
    pub live: bool,

    /// Day mode: gains against today's opening price.
    #[arg(long)]
    pub day: bool,

    /// Include crypto symbols.
    #[arg(long)]
    pub crypto: bool,

    /// Include unvested portfolios.
    #[arg(long)]
    pub unvested: bool,
}

#[derive(Debug, Args)]
pub struct SortArgs {
    /// Sort columns, comma-separated (e.g. "value,gain_pct").
    #[arg(long, value_delimiter = ',')]
    pub sort: Vec<String>,

    /// Sort descending.
    #[arg(long)]
    pub desc: bool,
}

#[derive(Debug, Subcommand)]
pub enum LotCommands {
    /// Add a purchase lot to an existing symbol.
    Add {
        portfolio: String,
        symbol: String,

        /// Purchase date, YYYY-MM-DD.
        #[arg(long)]
        date: String,

        /// Number of shares (fractional allowed).
        #[arg(long)]
        shares: f64,

        /// Price paid per share.
        #[arg(long)]
        cost: f64,

        /// Manual price override for symbols without market data.
        #[arg(long)]
        manual_price: Option<f64>,
    },

    /// Remove a lot by its index in the `lots` listing (newest first).
    Remove {
        portfolio: String,
        symbol: String,
        index: usize,
    },

    /// Update fields of an existing lot.
    Update {
        portfolio: String,
        symbol: String,
        index: usize,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        shares: Option<f64>,

        #[arg(long)]
        cost: Option<f64>,

        #[arg(long, conflicts_with = "clear_manual_price")]
        manual_price: Option<f64>,

        /// Remove the manual price override.
        #[arg(long)]
        clear_manual_price: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum SymbolCommands {
    /// Add a symbol (add lots afterwards with `lot add`).
    Add {
        portfolio: String,
        symbol: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Remove a symbol and all of its lots.
    Remove { portfolio: String, symbol: String },
}

#[derive(Debug, Subcommand)]
pub enum PortfolioCommands {
    /// Create a new, empty portfolio file.
    Create { name: String },

    /// Delete a portfolio file (its backup, if any, is kept).
    Delete { name: String },

    /// Copy the portfolio file to a `.bak` sibling.
    Backup { name: String },

    /// Restore the portfolio file from its `.bak` sibling.
    Restore { name: String },
}

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use crate::errors::CoreError;
use crate::models::lot::Lot;
use crate::models::portfolio::Portfolio;
use crate::models::stock::{Holding, StockEntry};

/// Loads and rewrites the directory of portfolio YAML files.
///
/// Loading is lenient: a malformed file, entry, or lot is skipped with a
/// warning so one bad record never hides the rest of the data. Mutations
/// are strict the other way around: a file the store cannot fully
/// represent is never rewritten, so a CRUD operation cannot silently drop
/// records a lenient pass would have skipped.
#[derive(Debug, Default)]
pub struct PortfolioStore {
    dir: PathBuf,
    portfolios: BTreeMap<String, Portfolio>,
    paths: BTreeMap<String, PathBuf>,
}

// ── Lenient file model (loading) ────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawPortfolio {
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    unvested: bool,
    stocks: Option<BTreeMap<String, RawStock>>,
}

#[derive(Debug, Deserialize)]
struct RawStock {
    description: Option<String>,
    notes: Option<String>,
    lots: Option<Vec<RawLot>>,
}

#[derive(Debug, Deserialize)]
struct RawLot {
    date: Option<String>,
    shares: Option<f64>,
    cost_basis: Option<f64>,
    // Any YAML value; non-numbers degrade to "no manual price".
    manual_price: Option<serde_yaml::Value>,
}

// ── Strict file model (mutations) ───────────────────────────────────

#[derive(Debug, Deserialize)]
struct FilePortfolio {
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    unvested: bool,
    #[serde(default)]
    stocks: BTreeMap<String, StockEntry>,
}

/// Partial update for one lot; `None` fields are left untouched.
/// `manual_price` is doubly optional so `Some(None)` can clear it.
#[derive(Debug, Default, Clone)]
pub struct LotUpdate {
    pub date: Option<NaiveDate>,
    pub shares: Option<f64>,
    pub cost_basis: Option<f64>,
    pub manual_price: Option<Option<f64>>,
}

impl PortfolioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            portfolios: BTreeMap::new(),
            paths: BTreeMap::new(),
        }
    }

    /// Load every `*.yaml` / `*.yml` file in the portfolios directory.
    ///
    /// A missing directory is fatal (nothing to track); individual bad
    /// files are skipped with a warning.
    pub fn load(&mut self) -> Result<(), CoreError> {
        if !self.dir.is_dir() {
            return Err(CoreError::PortfoliosDirNotFound(
                self.dir.display().to_string(),
            ));
        }

        self.portfolios.clear();
        self.paths.clear();

        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        files.sort();

        for path in files {
            let Some(portfolio) = parse_portfolio_file(&path) else {
                continue;
            };
            if self.portfolios.contains_key(&portfolio.name) {
                warn!(
                    "duplicate portfolio name '{}' in {}: keeping the later file",
                    portfolio.name,
                    path.display()
                );
            }
            self.paths.insert(portfolio.name.clone(), path);
            self.portfolios.insert(portfolio.name.clone(), portfolio);
        }
        Ok(())
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn names(&self) -> Vec<&str> {
        self.portfolios.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Portfolio> {
        self.portfolios.get(name)
    }

    pub fn portfolios(&self) -> impl Iterator<Item = &Portfolio> {
        self.portfolios.values()
    }

    /// Flatten every portfolio into `(portfolio, symbol)` holdings,
    /// ordered by portfolio name then symbol.
    pub fn all_holdings(&self) -> Vec<Holding> {
        self.portfolios
            .values()
            .flat_map(|p| {
                p.stocks.iter().map(|(symbol, entry)| Holding {
                    portfolio: p.name.clone(),
                    symbol: symbol.clone(),
                    description: entry.description.clone(),
                    notes: entry.notes.clone(),
                    unvested: p.unvested,
                    lots: entry.lots.clone(),
                })
            })
            .collect()
    }

    // ── Portfolio-level operations ──────────────────────────────────

    /// Create a new, empty portfolio file named `<name>.yaml`.
    pub fn create_portfolio(&mut self, name: &str) -> Result<(), CoreError> {
        validate_name(name)?;
        if self.portfolios.contains_key(name) {
            return Err(CoreError::ValidationError(format!(
                "portfolio '{name}' already exists"
            )));
        }
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{name}.yaml"));
        if path.exists() {
            return Err(CoreError::ValidationError(format!(
                "portfolio file already exists: {}",
                path.display()
            )));
        }

        let portfolio = Portfolio::new(name);
        write_atomic(&path, &portfolio)?;
        self.paths.insert(name.to_string(), path);
        self.portfolios.insert(name.to_string(), portfolio);
        Ok(())
    }

    /// Delete a portfolio file and forget it. The backup, if any, stays.
    pub fn delete_portfolio(&mut self, name: &str) -> Result<(), CoreError> {
        let path = self.path_for(name)?.to_path_buf();
        std::fs::remove_file(&path)?;
        self.paths.remove(name);
        self.portfolios.remove(name);
        Ok(())
    }

    /// Copy the portfolio file to a `.bak` sibling, replacing any
    /// previous backup.
    pub fn backup_portfolio(&self, name: &str) -> Result<PathBuf, CoreError> {
        let path = self.path_for(name)?;
        let backup = backup_path(path);
        std::fs::copy(path, &backup)?;
        Ok(backup)
    }

    /// Overwrite the portfolio file from its `.bak` sibling.
    pub fn restore_portfolio(&mut self, name: &str) -> Result<(), CoreError> {
        let path = self.path_for(name)?.to_path_buf();
        let backup = backup_path(&path);
        if !backup.exists() {
            return Err(CoreError::ValidationError(format!(
                "no backup found for portfolio '{name}': {}",
                backup.display()
            )));
        }
        std::fs::copy(&backup, &path)?;
        self.refresh_one(name, &path);
        Ok(())
    }

    // ── Symbol-level operations ─────────────────────────────────────

    /// Add a symbol with no lots yet. Until a lot is added the entry is
    /// persisted but skipped by the lenient loader.
    pub fn add_symbol(
        &mut self,
        name: &str,
        symbol: &str,
        description: &str,
    ) -> Result<(), CoreError> {
        let symbol = normalize_symbol(symbol)?;
        self.mutate(name, |portfolio| {
            if portfolio.stocks.contains_key(&symbol) {
                return Err(CoreError::ValidationError(format!(
                    "symbol {symbol} already exists in portfolio {}",
                    portfolio.name
                )));
            }
            portfolio
                .stocks
                .insert(symbol.clone(), StockEntry::new(description));
            Ok(())
        })
    }

    /// Remove a symbol and all of its lots.
    pub fn remove_symbol(&mut self, name: &str, symbol: &str) -> Result<(), CoreError> {
        let symbol = normalize_symbol(symbol)?;
        self.mutate(name, |portfolio| {
            if portfolio.stocks.remove(&symbol).is_none() {
                return Err(CoreError::SymbolNotFound {
                    portfolio: portfolio.name.clone(),
                    symbol: symbol.clone(),
                });
            }
            Ok(())
        })
    }

    // ── Lot-level operations ────────────────────────────────────────

    /// Append a purchase lot to an existing symbol.
    pub fn add_lot(&mut self, name: &str, symbol: &str, lot: Lot) -> Result<(), CoreError> {
        let symbol = normalize_symbol(symbol)?;
        validate_lot(&lot)?;
        self.mutate(name, |portfolio| {
            let entry = entry_mut(portfolio, &symbol)?;
            entry.lots.push(lot);
            Ok(())
        })
    }

    /// Remove the lot at `index`, counted in the newest-date-first order
    /// the `lots` listing shows.
    pub fn remove_lot(&mut self, name: &str, symbol: &str, index: usize) -> Result<(), CoreError> {
        let symbol = normalize_symbol(symbol)?;
        self.mutate(name, |portfolio| {
            let entry = entry_mut(portfolio, &symbol)?;
            entry.sort_lots();
            if index >= entry.lots.len() {
                return Err(CoreError::LotNotFound {
                    symbol: symbol.clone(),
                    index,
                    count: entry.lots.len(),
                });
            }
            entry.lots.remove(index);
            Ok(())
        })
    }

    /// Apply a partial update to the lot at `index` (newest-first order).
    pub fn update_lot(
        &mut self,
        name: &str,
        symbol: &str,
        index: usize,
        update: LotUpdate,
    ) -> Result<(), CoreError> {
        let symbol = normalize_symbol(symbol)?;
        self.mutate(name, |portfolio| {
            let entry = entry_mut(portfolio, &symbol)?;
            entry.sort_lots();
            let count = entry.lots.len();
            let lot = entry
                .lots
                .get_mut(index)
                .ok_or_else(|| CoreError::LotNotFound {
                    symbol: symbol.clone(),
                    index,
                    count,
                })?;

            if let Some(date) = update.date {
                lot.date = date;
            }
            if let Some(shares) = update.shares {
                lot.shares = shares;
            }
            if let Some(cost_basis) = update.cost_basis {
                lot.cost_basis = cost_basis;
            }
            if let Some(manual_price) = update.manual_price {
                lot.manual_price = manual_price;
            }
            validate_lot(lot)?;
            Ok(())
        })
    }

    // ── Internals ───────────────────────────────────────────────────

    fn path_for(&self, name: &str) -> Result<&Path, CoreError> {
        self.paths
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| CoreError::PortfolioNotFound(name.to_string()))
    }

    /// Read-mutate-rewrite cycle shared by every mutation: parse the file
    /// strictly, apply the closure, normalize lot order, write the whole
    /// file back atomically, then refresh the in-memory view.
    fn mutate<F>(&mut self, name: &str, op: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut Portfolio) -> Result<(), CoreError>,
    {
        let path = self.path_for(name)?.to_path_buf();
        let mut portfolio = read_portfolio_strict(&path)?;
        op(&mut portfolio)?;
        write_atomic(&path, &portfolio)?;
        self.refresh_one(name, &path);
        Ok(())
    }

    fn refresh_one(&mut self, name: &str, path: &Path) {
        match parse_portfolio_file(path) {
            Some(portfolio) => {
                self.portfolios.insert(name.to_string(), portfolio);
            }
            None => {
                self.portfolios.remove(name);
            }
        }
    }
}

// ── Lenient parsing ─────────────────────────────────────────────────

fn parse_portfolio_file(path: &Path) -> Option<Portfolio> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("skipping unreadable portfolio file {}: {e}", path.display());
            return None;
        }
    };
    let raw: RawPortfolio = match serde_yaml::from_str(&text) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("skipping malformed portfolio file {}: {e}", path.display());
            return None;
        }
    };

    let name = raw.name.unwrap_or_else(|| file_stem(path));
    let Some(raw_stocks) = raw.stocks else {
        warn!(
            "skipping portfolio file {}: no stocks section",
            path.display()
        );
        return None;
    };

    let mut stocks = BTreeMap::new();
    for (symbol, raw_stock) in raw_stocks {
        if let Some(entry) = validate_entry(&name, &symbol, raw_stock) {
            stocks.insert(symbol, entry);
        }
    }

    Some(Portfolio {
        name,
        description: raw.description,
        unvested: raw.unvested,
        stocks,
    })
}

fn validate_entry(portfolio: &str, symbol: &str, raw: RawStock) -> Option<StockEntry> {
    let Some(raw_lots) = raw.lots else {
        warn!("skipping {portfolio}/{symbol}: no lots list");
        return None;
    };

    let lots: Vec<Lot> = raw_lots
        .into_iter()
        .enumerate()
        .filter_map(|(i, raw_lot)| validate_raw_lot(portfolio, symbol, i, raw_lot))
        .collect();
    if lots.is_empty() {
        warn!("skipping {portfolio}/{symbol}: no valid lots");
        return None;
    }

    let mut entry = StockEntry {
        description: raw.description.unwrap_or_default(),
        notes: raw.notes.unwrap_or_default(),
        lots,
    };
    entry.sort_lots();
    Some(entry)
}

fn validate_raw_lot(portfolio: &str, symbol: &str, index: usize, raw: RawLot) -> Option<Lot> {
    let date = match raw.date.as_deref() {
        Some(text) => match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                warn!("dropping lot {index} of {portfolio}/{symbol}: bad date '{text}'");
                return None;
            }
        },
        None => {
            warn!("dropping lot {index} of {portfolio}/{symbol}: missing date");
            return None;
        }
    };
    let Some(shares) = raw.shares else {
        warn!("dropping lot {index} of {portfolio}/{symbol}: missing shares");
        return None;
    };
    let Some(cost_basis) = raw.cost_basis else {
        warn!("dropping lot {index} of {portfolio}/{symbol}: missing cost_basis");
        return None;
    };

    let manual_price = match raw.manual_price {
        None => None,
        Some(value) => match value.as_f64() {
            Some(price) => Some(price),
            None => {
                warn!(
                    "ignoring non-numeric manual_price on lot {index} of {portfolio}/{symbol}"
                );
                None
            }
        },
    };

    Some(Lot {
        date,
        shares,
        cost_basis,
        manual_price,
    })
}

// ── Strict parsing + rewrite ────────────────────────────────────────

fn read_portfolio_strict(path: &Path) -> Result<Portfolio, CoreError> {
    let text = std::fs::read_to_string(path)?;
    let file: FilePortfolio = serde_yaml::from_str(&text).map_err(|e| {
        CoreError::Deserialization(format!(
            "cannot rewrite {}: {e}: fix the file first",
            path.display()
        ))
    })?;
    Ok(Portfolio {
        name: file.name.unwrap_or_else(|| file_stem(path)),
        description: file.description,
        unvested: file.unvested,
        stocks: file.stocks,
    })
}

/// Whole-file rewrite via a temp sibling and rename, so a crash mid-write
/// leaves the original intact. Lot order is normalized before writing.
fn write_atomic(path: &Path, portfolio: &Portfolio) -> Result<(), CoreError> {
    let mut normalized = portfolio.clone();
    for entry in normalized.stocks.values_mut() {
        entry.sort_lots();
    }

    let yaml = serde_yaml::to_string(&normalized)
        .map_err(|e| CoreError::Serialization(e.to_string()))?;

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    std::fs::write(&tmp, yaml)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────

fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed")
        .to_string()
}

fn validate_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::ValidationError(
            "portfolio name must not be empty".to_string(),
        ));
    }
    if name.contains(['/', '\\']) || name.contains("..") {
        return Err(CoreError::ValidationError(format!(
            "portfolio name must be a plain file stem: '{name}'"
        )));
    }
    Ok(())
}

fn normalize_symbol(symbol: &str) -> Result<String, CoreError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(CoreError::ValidationError(
            "symbol must not be empty".to_string(),
        ));
    }
    Ok(symbol)
}

fn validate_lot(lot: &Lot) -> Result<(), CoreError> {
    if lot.shares <= 0.0 {
        return Err(CoreError::ValidationError(format!(
            "shares must be positive, got {}",
            lot.shares
        )));
    }
    if lot.cost_basis < 0.0 {
        return Err(CoreError::ValidationError(format!(
            "cost basis must not be negative, got {}",
            lot.cost_basis
        )));
    }
    if let Some(price) = lot.manual_price {
        if price < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "manual price must not be negative, got {price}"
            )));
        }
    }
    Ok(())
}

fn entry_mut<'a>(
    portfolio: &'a mut Portfolio,
    symbol: &str,
) -> Result<&'a mut StockEntry, CoreError> {
    let name = portfolio.name.clone();
    portfolio
        .stocks
        .get_mut(symbol)
        .ok_or(CoreError::SymbolNotFound {
            portfolio: name,
            symbol: symbol.to_string(),
        })
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::CoreError;

/// Typed application configuration, loaded once at startup.
///
/// Every field has a documented default, so a missing config file (or a
/// partial one) is perfectly fine. An unreadable or malformed file is a
/// fatal configuration error; ad-hoc fallback lookups at call sites are
/// deliberately avoided.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub display: DisplayConfig,
    pub currency: CurrencyConfig,
    pub api: ApiConfig,
    pub portfolio: PortfolioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory containing one YAML file per portfolio.
    pub portfolios_dir: PathBuf,
    /// On-disk JSON mirror of the quote cache.
    pub cache_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            portfolios_dir: PathBuf::from("conf/portfolios"),
            cache_file: PathBuf::from("conf/quote_cache.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub terminal_width: u16,
    pub max_description_length: usize,
    pub stretch_to_terminal: bool,
    pub default_sort_column: String,
    pub default_sort_descending: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            terminal_width: 120,
            max_description_length: 28,
            stretch_to_terminal: true,
            default_sort_column: "symbol".to_string(),
            default_sort_descending: false,
        }
    }
}

/// How negative currency amounts are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeFormat {
    /// `(1,234.56)`
    Parentheses,
    /// `-1,234.56`
    Minus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyConfig {
    pub decimal_places: usize,
    pub show_symbol: bool,
    pub colored_mode: bool,
    pub negative_format: NegativeFormat,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            decimal_places: 2,
            show_symbol: true,
            colored_mode: true,
            negative_format: NegativeFormat::Parentheses,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub yahoo: YahooApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YahooApiConfig {
    /// Per-request HTTP timeout in seconds.
    pub timeout: u64,
    /// Number of retry attempts after the initial fetch fails.
    pub retries: u32,
    /// Seconds a cached quote stays valid.
    pub cache_duration: u64,
}

impl Default for YahooApiConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            retries: 3,
            cache_duration: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioConfig {
    /// Symbols always treated as crypto, in addition to the suffix heuristic.
    pub crypto_symbols: Vec<String>,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the defaults; a file that exists but cannot be
    /// read or parsed is fatal.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: AppConfig = serde_yaml::from_str(&text)
            .map_err(|e| CoreError::Config(format!("invalid config {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity-check values that would otherwise fail far from their source.
    fn validate(&self) -> Result<(), CoreError> {
        if self.api.yahoo.cache_duration == 0 {
            return Err(CoreError::Config(
                "api.yahoo.cache_duration must be at least 1 second".into(),
            ));
        }
        if self.display.max_description_length < 4 {
            return Err(CoreError::Config(
                "display.max_description_length must be at least 4".into(),
            ));
        }
        Ok(())
    }
}

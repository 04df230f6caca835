use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Suffixes that mark a symbol as a crypto pair on Yahoo Finance.
/// Heuristic, not a complete asset-class classifier: it covers the common
/// quote currencies ("BTC-USD", "ETH-BTC", ...) and nothing more.
const CRYPTO_SUFFIXES: [&str; 5] = ["-USD", "-BTC", "-ETH", "-USDT", "-USDC"];

/// Classify a symbol as crypto, either by the configured explicit list or
/// by the trailing-pair suffix heuristic.
pub fn is_crypto(symbol: &str, configured: &[String]) -> bool {
    let upper = symbol.to_uppercase();
    if configured.iter().any(|s| s.to_uppercase() == upper) {
        return true;
    }
    CRYPTO_SUFFIXES.iter().any(|suf| upper.ends_with(suf))
}

/// A market quote for one symbol, shared across every portfolio that
/// references the symbol (quotes are never scoped per portfolio).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub current_price: f64,
    /// Opening price of the day the quote was fetched. Day mode compares
    /// against this, which conflates "daily gain" with "fetch-time gain"
    /// when the cache is stale; kept as documented behavior.
    pub open_price: f64,
    pub description: String,
    /// Epoch seconds when this quote was fetched.
    #[serde(default)]
    pub fetched_at: u64,
}

/// Time-windowed store of the last known quote per symbol.
///
/// Explicitly constructed and passed by reference to whatever needs it;
/// there is no process-wide singleton. The on-disk JSON mirror has two
/// top-level mappings, `quotes` and `timestamps`, matching the serialized
/// shape of this struct.
///
/// Stale entries are never deleted, only treated as invalid and later
/// overwritten by a fresh fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteCache {
    pub quotes: HashMap<String, Quote>,
    /// Symbol → epoch seconds of the last successful fetch.
    pub timestamps: HashMap<String, u64>,

    /// Validity window in seconds; injected from config, not persisted.
    #[serde(skip)]
    pub cache_duration: u64,
}

impl QuoteCache {
    pub fn new(cache_duration: u64) -> Self {
        Self {
            cache_duration,
            ..Self::default()
        }
    }

    /// Current wall-clock time as epoch seconds.
    pub fn now() -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }

    /// Store a quote, stamping it with the given fetch time.
    pub fn insert(&mut self, mut quote: Quote, fetched_at: u64) {
        quote.fetched_at = fetched_at;
        self.timestamps.insert(quote.symbol.clone(), fetched_at);
        self.quotes.insert(quote.symbol.clone(), quote);
    }

    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    /// A cached entry is valid iff `now - fetched_at < cache_duration`.
    /// Pure function of the supplied clock, for testability.
    pub fn is_valid_at(&self, symbol: &str, now: u64) -> bool {
        match self.timestamps.get(symbol) {
            Some(&at) => now.saturating_sub(at) < self.cache_duration,
            None => false,
        }
    }

    pub fn is_valid(&self, symbol: &str) -> bool {
        self.is_valid_at(symbol, Self::now())
    }

    /// Drop every in-memory entry. Used by a live refresh to force all
    /// symbols to be fetched fresh this run; the disk mirror is only
    /// rewritten after the refetch.
    pub fn clear(&mut self) {
        self.quotes.clear();
        self.timestamps.clear();
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// Where a position's display price came from.
///
/// Models the "quote or manual override" union explicitly so the
/// aggregation step consumes one shape regardless of source.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedPrice {
    /// A live or cached market quote.
    Fetched {
        price: f64,
        open: f64,
        description: String,
    },
    /// A user-supplied manual price (no open price, no description).
    Manual(f64),
}

impl ResolvedPrice {
    pub fn price(&self) -> f64 {
        match self {
            ResolvedPrice::Fetched { price, .. } => *price,
            ResolvedPrice::Manual(price) => *price,
        }
    }

    /// Day-mode baseline price. A manual price has no market open, so it
    /// serves as its own baseline (day gain reads as zero).
    pub fn open(&self) -> f64 {
        match self {
            ResolvedPrice::Fetched { open, .. } => *open,
            ResolvedPrice::Manual(price) => *price,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            ResolvedPrice::Fetched { description, .. } => Some(description),
            ResolvedPrice::Manual(_) => None,
        }
    }
}

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use crate::models::quote::{Quote, QuoteCache};
use crate::providers::traits::QuoteProvider;
use crate::storage::cache_store;

/// Fixed wait between fetch attempts.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Fetches quotes through the provider seam with cache-first semantics.
///
/// - A valid cached entry is returned without any network call.
/// - A miss fetches with up to `retries` additional attempts and a fixed
///   1-second backoff between them.
/// - Exhausted retries yield `None` (absence, not an error). The caller
///   falls back to a manual price or skips the symbol.
/// - Every successful fetch persists the full cache to the JSON mirror
///   (when one is configured).
pub struct QuoteService {
    provider: Box<dyn QuoteProvider>,
    retries: u32,
    cache_file: Option<PathBuf>,
}

impl QuoteService {
    pub fn new(provider: Box<dyn QuoteProvider>, retries: u32, cache_file: Option<PathBuf>) -> Self {
        Self {
            provider,
            retries,
            cache_file,
        }
    }

    /// Get a quote for one symbol, from cache when valid, otherwise fetched.
    pub async fn get(&self, cache: &mut QuoteCache, symbol: &str) -> Option<Quote> {
        if cache.is_valid(symbol) {
            return cache.get(symbol).cloned();
        }

        let quote = self.fetch_with_retries(symbol).await?;
        cache.insert(quote.clone(), QuoteCache::now());
        self.persist(cache);
        Some(quote)
    }

    /// Fetch quotes for every symbol in `symbols` that is absent or expired.
    /// Returns the number of symbols that ended up without any quote.
    pub async fn get_many(&self, cache: &mut QuoteCache, symbols: &[String]) -> usize {
        let mut missing = 0;
        for symbol in symbols {
            if self.get(cache, symbol).await.is_none() {
                warn!("no quote available for {symbol}");
                missing += 1;
            }
        }
        missing
    }

    async fn fetch_with_retries(&self, symbol: &str) -> Option<Quote> {
        let attempts = self.retries + 1;
        for attempt in 1..=attempts {
            match self.provider.fetch_quote(symbol).await {
                Ok(quote) => return Some(quote),
                Err(e) if attempt < attempts => {
                    debug!("attempt {attempt}/{attempts} for {symbol} failed: {e}");
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                Err(e) => {
                    warn!(
                        "failed to fetch {symbol} after {attempts} attempts ({}): {e}",
                        self.provider.name()
                    );
                }
            }
        }
        None
    }

    /// Best-effort mirror write; a failed write never fails the fetch.
    fn persist(&self, cache: &QuoteCache) {
        if let Some(path) = &self.cache_file {
            if let Err(e) = cache_store::save(cache, path) {
                warn!("could not persist quote cache to {}: {e}", path.display());
            }
        }
    }
}

/// Split `symbols` into the subset that actually needs a network fetch:
/// valid-cached and manually-priced symbols are excluded.
pub fn fetch_set(
    cache: &QuoteCache,
    symbols: &[String],
    manual_priced: &[String],
) -> Vec<String> {
    symbols
        .iter()
        .filter(|s| !manual_priced.contains(s) && !cache.is_valid(s))
        .cloned()
        .collect()
}

use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::quote::Quote;

/// Trait abstraction for market-data sources.
///
/// The quote service only sees this seam, so the Yahoo client can be
/// swapped out (or mocked in tests) without touching the cache, retry, or
/// aggregation logic.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Fetch the current quote for one symbol. `fetched_at` is stamped by
    /// the cache on insert, not by the provider.
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError>;
}

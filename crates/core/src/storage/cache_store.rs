use std::path::Path;

use tracing::warn;

use crate::errors::CoreError;
use crate::models::quote::QuoteCache;

/// Load the quote cache from its JSON mirror.
///
/// A missing or corrupt file is non-fatal: the run starts with an empty
/// cache and every symbol is fetched fresh.
pub fn load(path: &Path, cache_duration: u64) -> QuoteCache {
    if !path.exists() {
        return QuoteCache::new(cache_duration);
    }

    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str::<QuoteCache>(&text).map_err(|e| e.to_string()));

    match parsed {
        Ok(mut cache) => {
            cache.cache_duration = cache_duration;
            cache
        }
        Err(e) => {
            warn!(
                "ignoring unreadable quote cache {}: {e}: starting empty",
                path.display()
            );
            QuoteCache::new(cache_duration)
        }
    }
}

/// Persist the full cache (quotes + timestamps) as pretty-printed JSON.
pub fn save(cache: &QuoteCache, path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(cache)
        .map_err(|e| CoreError::Serialization(e.to_string()))?;
    std::fs::write(path, json)?;
    Ok(())
}

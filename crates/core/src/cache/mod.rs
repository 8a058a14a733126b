//! In-memory response cache for upstream API calls.
//!
//! This module provides a volatile, bounded key-value store used in front of
//! outbound HTTP requests. It supports:
//!
//! - Per-entry expiry (TTL), checked lazily on access
//! - A hard cap on the number of entries with least-recently-used eviction
//! - Cache keys that separate authenticated from anonymous responses
//! - A process-wide instance for ergonomic call sites
//!
//! Nothing here is persisted; a restart starts from an empty cache.

pub mod clock;
pub mod key;
pub mod store;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde_json::Value;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{AccessClass, class_cache_key, generate_cache_key};
pub use store::{ApiCache, CacheStats, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};

static API_CACHE: OnceLock<Arc<ApiCache<Value>>> = OnceLock::new();

/// The process-wide response cache.
///
/// Created with default capacity and TTL on first use unless
/// [`init_api_cache`] ran earlier.
pub fn api_cache() -> Arc<ApiCache<Value>> {
    API_CACHE
        .get_or_init(|| Arc::new(ApiCache::new(DEFAULT_MAX_ENTRIES, DEFAULT_TTL)))
        .clone()
}

/// Initialize the process-wide response cache with explicit limits.
///
/// Only the first initialization takes effect. Later calls return the
/// existing instance unchanged.
pub fn init_api_cache(max_entries: usize, default_ttl: Duration) -> Arc<ApiCache<Value>> {
    let mut created = false;
    let cache = API_CACHE
        .get_or_init(|| {
            created = true;
            Arc::new(ApiCache::new(max_entries, default_ttl))
        })
        .clone();

    if !created && (cache.max_entries() != max_entries.max(1) || cache.default_ttl() != default_ttl) {
        tracing::warn!(
            max_entries,
            default_ttl_ms = default_ttl.as_millis() as u64,
            "process-wide cache already initialized; ignoring new limits"
        );
    }

    cache
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_cache_is_shared() {
        let first = api_cache();
        let second = api_cache();
        assert!(Arc::ptr_eq(&first, &second));

        let again = init_api_cache(5, Duration::from_secs(1));
        assert!(Arc::ptr_eq(&first, &again));
    }
}

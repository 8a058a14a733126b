//! cache_purge tool implementation.
//!
//! Removes one URL's entry, every expired entry, or everything.

use presetsync_client::CachingFetcher;
use presetsync_core::cache::AccessClass;
use presetsync_core::{ApiCache, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Remove the entry cached for this URL.
    #[serde(default)]
    pub url: Option<String>,

    /// With `url`: target the authenticated entry instead of the public one.
    #[serde(default)]
    pub authenticated: bool,

    /// Remove every expired entry.
    #[serde(default)]
    pub expired_only: bool,

    /// Remove every entry.
    #[serde(default)]
    pub all: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: usize,
}

/// Implementation of the cache_purge tool.
///
/// `all` wins over the other options since it subsumes them.
pub fn purge_impl(cache: &ApiCache<Value>, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.url.is_none() && !params.expired_only && !params.all {
        return Err(Error::InvalidInput("At least one of url, expired_only, or all must be specified".to_string()).into());
    }

    let deleted = if params.all {
        let size = cache.stats().size;
        cache.clear();
        size
    } else {
        let mut deleted = 0;

        if let Some(url) = params.url.as_deref() {
            let class = if params.authenticated { AccessClass::Auth } else { AccessClass::Public };
            let key = CachingFetcher::class_cache_key(url, class)?;
            if cache.delete(&key) {
                deleted += 1;
            }
        }

        if params.expired_only {
            deleted += cache.purge_expired();
        }

        deleted
    };

    tracing::debug!("cache purge removed {} entries", deleted);

    json_result(&CachePurgeOutput { deleted })
}

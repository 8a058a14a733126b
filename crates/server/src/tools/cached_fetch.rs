//! cached_fetch tool implementation.
//!
//! GETs a JSON URL through the shared response cache.

use std::time::Duration;

use presetsync_client::{CachingFetcher, FetchOptions, GithubClient};
use presetsync_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json_result;

/// Input parameters for cached_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachedFetchParams {
    /// The URL to fetch. Must return JSON.
    pub url: String,

    /// Send the configured GitHub token with the request. Only allowed for
    /// URLs on the configured GitHub API origin.
    #[serde(default)]
    pub authenticated: bool,

    /// Cache lifetime for a fresh response in milliseconds (default: server's default TTL).
    #[serde(default)]
    pub cache_ttl_ms: Option<u64>,
}

/// Output structure for cached_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachedFetchOutput {
    /// Decoded response body.
    pub data: Value,
    /// Whether the response was served from the cache.
    pub from_cache: bool,
    /// Key the response is cached under.
    pub cache_key: String,
}

/// Implementation of the cached_fetch tool.
pub async fn fetch_impl(github: &GithubClient, params: CachedFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let mut options = FetchOptions::default();
    if params.authenticated {
        options = options.with_token(github.token_for_api(&params.url)?);
    }
    if let Some(ms) = params.cache_ttl_ms {
        options = options.with_cache_ttl(Duration::from_millis(ms));
    }

    let cache_key = CachingFetcher::cache_key(&params.url, options.token())?;
    let response = github.fetcher().cached_fetch::<Value>(&params.url, &options).await?;

    json_result(&CachedFetchOutput { data: response.data, from_cache: response.from_cache, cache_key })
}

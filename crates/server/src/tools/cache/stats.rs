//! cache_stats tool implementation.

use presetsync_core::ApiCache;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde_json::Value;

use crate::tools::json_result;

/// Implementation of the cache_stats tool.
pub fn stats_impl(cache: &ApiCache<Value>) -> Result<CallToolResult, McpError> {
    json_result(&cache.stats())
}

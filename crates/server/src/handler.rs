//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::{
    CachedFetchParams, ImportPresetsParams,
    cache::{CachePurgeParams, purge_impl, stats_impl},
    fetch_impl, import_impl,
};

use presetsync_client::{CachingFetcher, GithubClient};
use presetsync_core::{AppConfig, Error};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for presetsync.
#[derive(Clone)]
pub struct PresetSyncServer {
    fetcher: CachingFetcher,
    github: GithubClient,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl PresetSyncServer {
    /// Create a server handler from loaded configuration.
    ///
    /// The fetcher uses the process-wide response cache, sized from `config`.
    pub fn new(config: &AppConfig) -> Result<Self, Error> {
        let fetcher = CachingFetcher::from_app_config(config)?;
        let github = GithubClient::from_app_config(fetcher.clone(), config);
        Ok(Self::with_clients(fetcher, github))
    }

    /// Create a server handler around existing clients.
    pub fn with_clients(fetcher: CachingFetcher, github: GithubClient) -> Self {
        Self { fetcher, github, tool_router: Self::tool_router() }
    }

    /// GET a JSON URL through the response cache.
    #[tool(
        description = "Fetch a JSON URL through the response cache. Returns the decoded body, whether it came from the cache, and its cache key."
    )]
    async fn cached_fetch(&self, params: Parameters<CachedFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.github, params.0).await
    }

    /// Import URL presets from a GitHub repository.
    #[tool(
        description = "Import URL presets from the JSON files in a GitHub repository directory. Accepts owner/repo or a github.com URL."
    )]
    async fn import_presets(&self, params: Parameters<ImportPresetsParams>) -> Result<CallToolResult, McpError> {
        import_impl(&self.github, params.0).await
    }

    /// Report response cache size and capacity.
    #[tool(description = "Report the number of cached responses and the cache capacity.")]
    async fn cache_stats(&self) -> Result<CallToolResult, McpError> {
        stats_impl(self.fetcher.cache())
    }

    /// Remove entries from the response cache.
    #[tool(description = "Remove cached responses: one URL's entry, every expired entry, or everything.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(self.fetcher.cache(), params.0)
    }
}

impl ServerHandler for PresetSyncServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "presetsync-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Fetch JSON APIs through a bounded TTL cache and import URL presets from GitHub repositories.".into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

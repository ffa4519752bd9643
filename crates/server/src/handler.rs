//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::host::Host;
use crate::tools::cache::{CacheMatchParams, match_impl};
use crate::tools::{SwFetchParams, activate_impl, fetch_impl, install_impl, status_impl};

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

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwcacheServer {
    host: Arc<Host>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwcacheServer {
    /// Create a new server handler around a host.
    pub fn new(host: Host) -> Self {
        Self { host: Arc::new(host), tool_router: Self::tool_router() }
    }

    /// Run the install event.
    ///
    /// Precaches the manifest into the current static partition; all or nothing.
    #[tool(description = "Install the worker: precache every manifest entry into the current static partition.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.host).await
    }

    /// Run the activate event.
    #[tool(description = "Activate the installed worker: delete stale cache partitions and claim open clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.host).await
    }

    /// Dispatch a request through the worker.
    ///
    /// Returns the response plus how it was produced (cache, network or fallback).
    #[tool(
        description = "Dispatch a request as a controlled page would. Returns the response and whether it came from cache, network or an offline fallback."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.host, params.0).await
    }

    #[tool(description = "Report worker state, cache partitions with entry counts, and controlled clients.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.host).await
    }

    /// Look a URL up in the cache.
    #[tool(description = "Look a URL up in one cache partition, or in every partition in creation order.")]
    async fn cache_match(&self, params: Parameters<CacheMatchParams>) -> Result<CallToolResult, McpError> {
        match_impl(&self.host, params.0).await
    }
}

impl ServerHandler for SwcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
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

//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the engine-backed implementations.
use std::sync::Arc;
use url::Url;

use cachegate_core::CacheDb;
use cachegate_engine::ProxyEngine;

use crate::tools::{
    CacheGetParams, CachePurgeParams, ProxyFetchParams, fetch_impl, get_impl, purge_impl, status_impl,
};

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

/// The main MCP server handler for cachegate.
#[derive(Clone)]
pub struct CacheGateServer {
    engine: Arc<ProxyEngine>,
    db: CacheDb,
    scope: Option<Url>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl CacheGateServer {
    /// Create a new server handler around a started engine.
    pub fn new(engine: Arc<ProxyEngine>, db: CacheDb, scope: Option<Url>) -> Self {
        Self { engine, db, scope, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Send a request through the caching proxy. Returns where the response came from (network, cache or passthrough), its route class, status and body."
    )]
    async fn proxy_fetch(&self, params: Parameters<ProxyFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.engine, self.scope.as_ref(), params.0).await
    }

    #[tool(description = "Report the current generation, its state, and every generation persisted in the cache.")]
    async fn generation_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.engine, &self.db).await
    }

    #[tool(description = "Read one entry from the current generation without contacting the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.engine, self.scope.as_ref(), params.0).await
    }

    #[tool(description = "Delete one entry from the current generation.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.engine, self.scope.as_ref(), params.0).await
    }
}

impl ServerHandler for CacheGateServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "cachegate".into(),
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

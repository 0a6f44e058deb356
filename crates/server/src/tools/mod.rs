//! MCP tool implementations.
//!
//! This module contains all tools exposed by the cachegate server.

pub mod cache;
pub mod generation;
pub mod proxy_fetch;

pub use cache::{CacheGetParams, CachePurgeParams, get_impl, purge_impl};
pub use generation::status_impl;
pub use proxy_fetch::{ProxyFetchParams, fetch_impl};

use cachegate_core::{Error, Response};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use url::Url;

/// Parse a tool URL argument, resolving relative paths against the app scope.
pub(crate) fn parse_url(input: &str, scope: Option<&Url>) -> Result<Url, Error> {
    cachegate_client::canonicalize_with_base(input, scope).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
}

/// Body as text when it is valid UTF-8.
pub(crate) fn body_text(response: &Response) -> Option<String> {
    std::str::from_utf8(&response.body).ok().map(str::to_string)
}

pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

//! cache_purge tool implementation.
//!
//! Deletes one entry from the current generation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use cachegate_engine::ProxyEngine;

use super::{default_method, target};
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Absolute URL, or a path relative to the app scope.
    pub url: String,

    /// HTTP method the entry was stored under (default: GET).
    #[serde(default = "default_method")]
    pub method: String,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    pub url: String,
    /// Whether an entry existed and was removed.
    pub deleted: bool,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(
    engine: &ProxyEngine, scope: Option<&Url>, params: CachePurgeParams,
) -> Result<CallToolResult, McpError> {
    let (store, url, key) = target(engine, scope, &params.url, &params.method)?;
    let deleted = store.delete(&key).await?;

    tracing::info!(url = %url, generation = %store.generation(), deleted, "purged cache entry");

    json_result(&CachePurgeOutput { url: url.to_string(), deleted })
}

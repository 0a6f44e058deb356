//! cache_get tool implementation.
//!
//! Reads one entry from the current generation without touching the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use cachegate_engine::ProxyEngine;

use super::{default_method, target};
use crate::tools::{body_text, json_result};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path relative to the app scope.
    pub url: String,

    /// HTTP method the entry was stored under (default: GET).
    #[serde(default = "default_method")]
    pub method: String,
}

/// A stored entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachedEntry {
    pub status: u16,
    pub response_type: String,
    pub content_type: Option<String>,
    /// RFC 3339 timestamp of the write.
    pub stored_at: String,
    pub body_bytes: usize,
    pub body: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    pub generation: String,
    /// The entry, absent on a miss.
    pub entry: Option<CachedEntry>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(engine: &ProxyEngine, scope: Option<&Url>, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let (store, url, key) = target(engine, scope, &params.url, &params.method)?;

    let entry = store.lookup(&key).await?.map(|cached| CachedEntry {
        status: cached.response.status,
        response_type: cached.response.response_type.as_str().to_string(),
        content_type: cached.response.content_type().map(str::to_string),
        stored_at: cached.stored_at.clone(),
        body_bytes: cached.response.body.len(),
        body: body_text(&cached.response),
    });

    let output = CacheGetOutput { url: url.to_string(), generation: store.generation().to_string(), entry };
    json_result(&output)
}

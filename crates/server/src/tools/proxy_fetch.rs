//! proxy_fetch tool implementation.
//!
//! Sends one request through the engine exactly as an intercepted request
//! would be handled.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use cachegate_core::{Error, Request, RequestMode};
use cachegate_engine::ProxyEngine;

use super::{body_text, json_result, parse_url};

/// Input parameters for proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchParams {
    /// Absolute URL, or a path relative to the app scope.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are cached.
    #[serde(default = "default_method")]
    pub method: String,

    /// Fetch mode: "navigate", "same-origin", "no-cors" (default) or "cors".
    #[serde(default)]
    pub mode: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchOutput {
    /// The canonical request URL.
    pub url: String,
    /// Where the response came from: "network", "cache" or "passthrough".
    pub outcome: String,
    /// Route class, absent for pass-through requests.
    pub route: Option<String>,
    pub status: u16,
    /// Fetch response type: "basic", "cors" or "opaque".
    pub response_type: String,
    pub content_type: Option<String>,
    pub body_bytes: usize,
    /// Body text, absent when the body is not UTF-8.
    pub body: Option<String>,
}

/// Implementation of the proxy_fetch tool.
pub async fn fetch_impl(
    engine: &ProxyEngine, scope: Option<&Url>, params: ProxyFetchParams,
) -> Result<CallToolResult, McpError> {
    let url = parse_url(&params.url, scope)?;
    let mode = match params.mode.as_deref() {
        Some(mode) => mode.parse::<RequestMode>()?,
        None => RequestMode::default(),
    };
    let request = Request::new(&params.method, url, mode);
    let route = engine.route(&request);

    let outcome = engine.on_request(&request).await?;
    let source = outcome.source();
    let Some(response) = outcome.into_response() else {
        return Err(Error::Unavailable(format!("{}: offline and not cached", request.url)).into());
    };

    let output = ProxyFetchOutput {
        url: request.url.to_string(),
        outcome: source.to_string(),
        route: route.map(|r| r.as_str().to_string()),
        status: response.status,
        response_type: response.response_type.as_str().to_string(),
        content_type: response.content_type().map(str::to_string),
        body_bytes: response.body.len(),
        body: body_text(&response),
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{CannedNetwork, output, scope, started_engine};
    use std::sync::Arc;

    fn params(url: &str, mode: Option<&str>) -> ProxyFetchParams {
        ProxyFetchParams { url: url.into(), method: default_method(), mode: mode.map(str::to_string) }
    }

    #[tokio::test]
    async fn test_navigation_online_then_offline() {
        let network = Arc::new(CannedNetwork::default());
        network.serve("https://app.test/index.html", 200, "<html>shell</html>");
        network.serve("https://app.test/about", 200, "<html>about</html>");
        let (_db, engine) = started_engine(network.clone()).await;

        let online = fetch_impl(&engine, Some(&scope()), params("/about", Some("navigate"))).await.unwrap();
        let online: ProxyFetchOutput = output(&online);
        assert_eq!(online.outcome, "network");
        assert_eq!(online.route.as_deref(), Some("navigation"));
        assert_eq!(online.body.as_deref(), Some("<html>about</html>"));

        network.clear();
        let offline = fetch_impl(&engine, Some(&scope()), params("/about", Some("navigate"))).await.unwrap();
        let offline: ProxyFetchOutput = output(&offline);
        assert_eq!(offline.outcome, "cache");
        assert_eq!(offline.body.as_deref(), Some("<html>shell</html>"));
    }

    #[tokio::test]
    async fn test_unavailable_maps_to_error_code() {
        let network = Arc::new(CannedNetwork::default());
        let (_db, engine) = started_engine(network).await;

        let err = fetch_impl(&engine, Some(&scope()), params("/app.js", None)).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_invalid_mode_rejected() {
        let network = Arc::new(CannedNetwork::default());
        let (_db, engine) = started_engine(network).await;

        let err = fetch_impl(&engine, Some(&scope()), params("/app.js", Some("websocket"))).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_post_passes_through() {
        let network = Arc::new(CannedNetwork::default());
        network.serve("https://api.example.com/x", 201, "created");
        let (_db, engine) = started_engine(network).await;

        let params = ProxyFetchParams { url: "https://api.example.com/x".into(), method: "POST".into(), mode: None };
        let result = fetch_impl(&engine, None, params).await.unwrap();
        let out: ProxyFetchOutput = output(&result);

        assert_eq!(out.outcome, "passthrough");
        assert_eq!(out.route, None);
        assert_eq!(out.status, 201);
    }
}

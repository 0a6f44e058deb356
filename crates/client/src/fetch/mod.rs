//! HTTP fetch against the origin.
//!
//! ### URL Canonicalization
//! - Trim whitespace, resolve relative URLs against the app scope
//! - Lowercase host, remove fragments
//! - Preserve query string
//!
//! ### Response semantics
//! - Only transport failures are errors; every HTTP status is a response.
//! - Max redirects: 5
//! - Max body bytes: 10MB (configurable)
//! - Response type follows the fetch model: same origin as the app scope is
//!   `basic`, cross-origin allowed by `Access-Control-Allow-Origin` is `cors`,
//!   anything else is `opaque`.

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, canonicalize_with_base};

use cachegate_core::{AppConfig, Error, NetworkFetch, Request, Response, ResponseType};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "cachegate/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Origin of the client application, used to derive response types.
    pub app_origin: Option<::url::Origin>,

    /// Honor HTTP(S)_PROXY environment variables (default: true)
    pub system_proxy: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "cachegate/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            app_origin: None,
            system_proxy: true,
        }
    }
}

impl FetchConfig {
    /// Build the fetch configuration from the application configuration.
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            app_origin: config.scope_url().ok().map(|u| u.origin()),
            ..Default::default()
        }
    }
}

/// Derive the fetch response type of a response served from `response_url`.
pub fn classify_response_type(
    app_origin: Option<&::url::Origin>, response_url: &::url::Url, headers: &header::HeaderMap,
) -> ResponseType {
    let Some(app_origin) = app_origin else {
        return ResponseType::Basic;
    };

    if &response_url.origin() == app_origin {
        return ResponseType::Basic;
    }

    let allowed = headers
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::trim);

    match allowed {
        Some("*") => ResponseType::Cors,
        Some(origin) if origin == app_origin.ascii_serialization() => ResponseType::Cors,
        _ => ResponseType::Opaque,
    }
}

/// HTTP fetch client used as the engine's network capability.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder();
        if !config.system_proxy {
            builder = builder.no_proxy();
        }

        let http = builder
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn too_large(&self, len: usize) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

fn transport_error(url: &::url::Url, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::Network(format!("{url}: {err}"))
    }
}

#[async_trait]
impl NetworkFetch for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let response = self
            .http
            .request(method, request.url.as_str())
            .send()
            .await
            .map_err(|e| transport_error(&request.url, &e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let response_type = classify_response_type(self.config.app_origin.as_ref(), &final_url, response.headers());
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = response.bytes().await.map_err(|e| transport_error(&request.url, &e))?;

        if body.len() > self.config.max_bytes {
            return Err(self.too_large(body.len()));
        }

        tracing::debug!(
            url = %request.url,
            final_url = %final_url,
            status,
            response_type = response_type.as_str(),
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched from network"
        );

        Ok(Response { url: final_url, status, response_type, headers, body })
    }
}

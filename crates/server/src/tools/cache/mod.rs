//! Cache-related MCP tools.
//!
//! These operate on entries of the current generation only.

pub mod get;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use purge::{CachePurgeParams, purge_impl};

use cachegate_core::{CacheStore, Error, RequestKey};
use cachegate_engine::ProxyEngine;
use std::sync::Arc;
use url::Url;

use super::parse_url;

fn default_method() -> String {
    "GET".into()
}

/// Resolve the current store and the key a tool call addresses.
fn target(
    engine: &ProxyEngine, scope: Option<&Url>, url: &str, method: &str,
) -> Result<(Arc<dyn CacheStore>, Url, RequestKey), Error> {
    let store = engine
        .current_store()
        .ok_or_else(|| Error::Unavailable(format!("generation {} has not started", engine.generation_tag())))?;
    let url = parse_url(url, scope)?;
    let key = RequestKey::new(&method.trim().to_ascii_uppercase(), &url);
    Ok((store, url, key))
}

//! cachegate server entry point.
//!
//! Boots the proxy engine for the configured generation, then serves MCP on
//! stdio. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cachegate_client::{FetchClient, FetchConfig};
use cachegate_core::{AppConfig, CacheDb};
use cachegate_engine::ProxyEngine;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(db_path = %config.db_path.display(), generation = %config.generation_tag, "starting cachegate");

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from_app(&config))?);
    let engine = Arc::new(ProxyEngine::from_config(&config, Arc::new(db.clone()), network)?);

    if let Some(report) = engine.on_generation_start().await?
        && report.required_failures() > 0
    {
        tracing::warn!(failed = report.required_failures(), "generation started with missing required assets");
    }
    engine.on_generation_activate().await?;

    let handler = handler::CacheGateServer::new(engine.clone(), db, config.scope_url().ok());
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    engine.drain().await;
    Ok(())
}

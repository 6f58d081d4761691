//! swcache server entry point.
//!
//! This is the main binary that boots the offline cache proxy and serves it
//! as an MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use swcache_client::{FetchClient, FetchConfig, OfflineProxy, ProxyConfig};
use swcache_core::{AppConfig, CacheDb};

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache database {}", config.db_path.display()))?;
    let fetcher = FetchClient::new(FetchConfig::from_app(&config))?;
    let proxy = Arc::new(OfflineProxy::new(ProxyConfig::from_app(&config)?, db, Arc::new(fetcher)));

    tracing::info!(
        static_cache = %proxy.config().static_cache,
        runtime_cache = %proxy.config().runtime_cache,
        "Starting swcache server on stdio transport"
    );

    let install = proxy.install().await;
    if !install.complete {
        tracing::warn!(failed = install.failed.len(), "precache incomplete");
    }
    if proxy.registration().may_activate() {
        proxy.activate().await;
    }

    let handler = handler::SwCacheServer::new(Arc::clone(&proxy));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    tracing::info!(pending = proxy.keep_alive().pending(), "transport closed, settling background work");
    proxy.keep_alive().settle().await;

    Ok(())
}

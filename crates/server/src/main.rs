//! shelter-mcp server entry point.
//!
//! Boots the offline gateway and serves it as MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shelter_client::{ChatClient, ChatConfig, FetchClient, FetchConfig, resolve};
use shelter_core::{AppConfig, CacheDb, Gateway, GatewayConfig, Registration};
use tracing_subscriber::EnvFilter;

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

    let config = Arc::new(AppConfig::load()?);
    tracing::info!(cache_name = %config.cache_name, origin = %config.origin, "Starting shelter-mcp on stdio transport");

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database at {}", config.db_path.display()))?;

    let network = FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        ..Default::default()
    })?;

    let registration = Arc::new(Registration::new());
    let gateway = Arc::new(Gateway::new(db.clone(), network.clone(), gateway_config(&config)?));

    if config.unregister_on_boot {
        let dropped = registration.unregister_all().await;
        tracing::info!(dropped, "unregistered every generation; requests pass through");
    } else if let Err(e) = registration.register(gateway.clone()).await {
        tracing::warn!(error = %e, "gateway install failed; requests pass through");
    }

    let chat = match &config.chat_api_url {
        Some(api_url) => Some(ChatClient::new(ChatConfig {
            api_url: api_url.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        })?),
        None => None,
    };

    let handler = handler::ShelterServer::new(registration, db, network, chat, config);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    gateway.flush().await;

    Ok(())
}

/// Gateway settings with every path resolved against the origin.
fn gateway_config(config: &AppConfig) -> Result<GatewayConfig> {
    let core_assets = config
        .core_assets
        .iter()
        .map(|asset| resolve(&config.origin, asset).map(|url| url.to_string()))
        .collect::<Result<Vec<_>, _>>()
        .context("resolving core_assets")?;
    let offline_url = resolve(&config.origin, &config.offline_url)
        .context("resolving offline_url")?
        .to_string();

    Ok(GatewayConfig { cache_name: config.cache_name.clone(), core_assets, offline_url, skip_waiting: true })
}

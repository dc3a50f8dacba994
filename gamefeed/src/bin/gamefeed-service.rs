//! Gamefeed service binary: loads configuration, wires the upstream connector, sanitization
//! pipeline, channel broadcaster and history collector, and runs until `SIGINT`/`SIGTERM`.
//!
//! This binary does not open a subscriber-facing socket itself (§1 Non-goals of the design
//! spec) — it is the headless core an embedding HTTP/WebSocket process would subscribe to via
//! [`gamefeed::service::Service::broadcaster`].

use anyhow::{Context, Result};
use gamefeed::config::Config;
use gamefeed::service::Service;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CONFIG_PATH_ENV: &str = "GAMEFEED_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/gamefeed.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
    let config = Config::load_layered(&config_path).context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(upstream_url = %config.upstream_url, host = %config.host, port = config.port, "gamefeed starting");

    let service = Service::new(config);
    let shutdown = Arc::new(Notify::new());

    let shutdown_for_signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(?error, "failed to install ctrl-c handler");
            return;
        }
        info!("shutdown signal received");
        // notify_waiters (not notify_one): the broadcast loop, connector loop and stats loop
        // each hold their own `shutdown.notified()` future and must all observe this signal.
        shutdown_for_signal.notify_waiters();
    });

    service.run(shutdown).await;
    info!("gamefeed stopped");
    Ok(())
}

//! portbridge forwarder
//!
//! Configuration-driven multi-endpoint TCP forwarder.
//!
//! This service:
//! - Loads named proxy definitions from a YAML file
//! - Opens one listening socket per enabled definition
//! - Dials the configured remote (with bounded retry) per accepted client
//! - Relays bytes in both directions until either side closes
//! - Tears everything down on SIGINT/SIGTERM and waits for in-flight work

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use portbridge_forwarder::config::Config;
use portbridge_forwarder::proxy::ProxyManager;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting portbridge forwarder");

    let config_path = Config::path_from_env();
    let config = Config::load(&config_path)?;
    info!(
        config_path = %config_path,
        proxy_count = config.proxies.len(),
        "Configuration loaded"
    );

    let manager = Arc::new(ProxyManager::new(config.proxies.clone()));
    manager.start().await?;

    info!("TCP proxy manager started successfully");
    for definition in config.proxies.iter().filter(|d| d.enabled) {
        info!(
            proxy = %definition.name,
            local_addr = %definition.local_addr(),
            remote_addr = %definition.remote_addr(),
            "Active proxy"
        );
    }

    shutdown_signal().await?;
    info!("Received shutdown signal");

    manager.shutdown().await;
    Ok(())
}

/// Wait for SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

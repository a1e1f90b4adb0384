//! Command implementations for the answer daemon.
//!
//! Handles:
//! - serve: Load config, build the resolver, start the HTTP server
//! - ask: Resolve one query and print the payload
//! - config: Print the effective configuration

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use answer_resolver::Resolver;
use answer_types::Settings;

use crate::server::{run_server_with_shutdown, AppState};

/// Load settings and apply the global CLI overrides.
pub fn load_settings(config_path: Option<&str>, log_level_override: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the configured level.
///
/// Logs go to stderr so `ask` output stays machine readable.
fn init_tracing(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

/// Start the HTTP server.
///
/// 1. Load configuration (defaults -> file -> env -> CLI)
/// 2. Build the resolver (providers, lookups, conversation store)
/// 3. Serve until SIGINT/SIGTERM
pub async fn start_server(
    config_path: Option<&str>,
    host_override: Option<&str>,
    port_override: Option<u16>,
    log_level_override: Option<&str>,
) -> Result<()> {
    let mut settings = load_settings(config_path, log_level_override)?;
    if let Some(host) = host_override {
        settings.http_host = host.to_string();
    }
    if let Some(port) = port_override {
        settings.http_port = port;
    }

    init_tracing(&settings.log_level)?;

    info!("Answer daemon starting...");
    info!("Configuration:");
    info!("  HTTP address: {}", settings.http_addr());
    info!("  Log level: {}", settings.log_level);
    info!(
        "  Providers: {}",
        settings
            .providers
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!(
        "  Retry: {} attempts, {}ms backoff unit, {}ms deadline",
        settings.retry.max_attempts, settings.retry.backoff_unit_ms, settings.retry.deadline_ms
    );

    let resolver = Resolver::from_settings(&settings).context("Failed to build resolver")?;

    let addr: SocketAddr = settings
        .http_addr()
        .parse()
        .context("Invalid HTTP address")?;

    run_server_with_shutdown(addr, AppState::new(resolver), shutdown_signal()).await
}

/// Resolve one query and print the JSON payload.
///
/// Fails (non-zero exit) when the payload status is not 200.
pub async fn ask(
    config_path: Option<&str>,
    query: &str,
    conversation: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<()> {
    let settings = load_settings(config_path, log_level_override)?;
    init_tracing(&settings.log_level)?;

    let resolver = Resolver::from_settings(&settings).context("Failed to build resolver")?;
    let response = resolver.resolve(query, conversation).await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.is_success() {
        anyhow::bail!("Resolution failed with status {}", response.status_code);
    }
    Ok(())
}

/// Print the effective configuration as TOML, secrets masked.
pub fn show_config(config_path: Option<&str>, log_level_override: Option<&str>) -> Result<()> {
    let settings = load_settings(config_path, log_level_override)?;
    print!("{}", settings.to_toml()?);
    Ok(())
}

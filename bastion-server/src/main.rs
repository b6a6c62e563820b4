//! Bastion Server - Headless Gateway Daemon
//!
//! - Proxies every deployed API with retries, slow-call detection and
//!   per-subscription circuit breakers
//! - Serves a read-only ops API on /api/*, plus /health and /metrics
//! - Reloads API definitions on SIGHUP

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod api;
mod cli;
mod commands;
mod router;
mod server_utils;
mod state;

#[cfg(test)]
mod test_helpers;

use bastion_core::modules::config::{default_config_path, load_config};
use bastion_core::modules::logger::{init_logger, LoggerOptions};
use bastion_core::proxy::{prometheus, AxumServer, Gateway, ServerStartConfig};
use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logger(&LoggerOptions {
        level: cli.log_level.clone(),
        json: cli.json_logs,
        log_dir: cli.log_dir.clone(),
    })
    .map_err(|e| anyhow::anyhow!(e))?;

    let config_path = resolve_config_path(cli.config.clone())?;

    match cli.command.clone().unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config_path, cli.port).await,
        Commands::Validate { json } => commands::validate(&config_path, json),
    }
}

fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    explicit
        .or_else(default_config_path)
        .context("no configuration file given and no default config directory on this platform")
}

async fn serve(config_path: PathBuf, port: Option<u16>) -> Result<()> {
    let _ = prometheus::init_metrics();

    let mut config = load_config(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(port) = port {
        config.port = port;
    }

    let gateway = Arc::new(Gateway::from_config(&config)?);
    let deployed = gateway.registry().replace_all(config.apis.clone())?;
    prometheus::update_deployed_gauge(deployed);
    info!("Deployed {} APIs from {}", deployed, config_path.display());

    let sweeper = gateway.breaker().start_sweeper();
    let state = AppState::new(Arc::clone(&gateway), config_path);

    #[cfg(unix)]
    let reloader = server_utils::spawn_reload_on_sighup(state.clone())?;

    let server = AxumServer::new(ServerStartConfig {
        host: config.host.clone(),
        port: config.port,
        gateway: Arc::clone(&gateway),
    })
    .with_routes(router::build_ops_router(state));

    info!("Ops API at http://{}/api/", config.bind_address());
    server
        .run(server_utils::shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))?;

    #[cfg(unix)]
    reloader.abort();
    gateway.breaker().shutdown();
    let _ = sweeper.await;
    info!("Bastion stopped");
    Ok(())
}

use tokio::signal;
use tracing::info;

#[allow(
    clippy::expect_used,
    reason = "Signal handlers are critical infrastructure, panic is appropriate on failure"
)]
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }

    info!("Draining in-flight requests");
}

/// Redeploy every API from the configuration file on each SIGHUP.
#[cfg(unix)]
pub fn spawn_reload_on_sighup(
    state: crate::state::AppState,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let mut hangup = signal::unix::signal(signal::unix::SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!(path = %state.config_path().display(), "Received SIGHUP, reloading configuration");
            match state.reload() {
                Ok(count) => info!(apis = count, "Configuration reloaded"),
                Err(e) => tracing::warn!("Reload failed, keeping current deployments: {:#}", e),
            }
        }
    }))
}

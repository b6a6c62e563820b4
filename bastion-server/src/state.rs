//! Application State
//!
//! Holds the gateway shared by the proxy router and the ops API, plus what is
//! needed to reload the configuration.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bastion_core::modules::config::load_config;
use bastion_core::proxy::{prometheus, ApiRegistry, CircuitBreakerManager, Gateway};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub gateway: Arc<Gateway>,
    pub config_path: PathBuf,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(gateway: Arc<Gateway>, config_path: PathBuf) -> Self {
        Self { inner: Arc::new(AppStateInner { gateway, config_path, started_at: Instant::now() }) }
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.inner.gateway
    }

    pub fn registry(&self) -> &Arc<ApiRegistry> {
        self.inner.gateway.registry()
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreakerManager> {
        self.inner.gateway.breaker()
    }

    pub fn config_path(&self) -> &Path {
        &self.inner.config_path
    }

    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }

    /// Re-read the configuration file and redeploy every API.
    ///
    /// Listener, header names and breaker cache bounds keep their startup values.
    pub fn reload(&self) -> Result<usize> {
        let config = load_config(self.config_path())
            .with_context(|| format!("reloading {}", self.config_path().display()))?;
        let count = self.registry().replace_all(config.apis)?;
        prometheus::update_deployed_gauge(count);
        Ok(count)
    }
}

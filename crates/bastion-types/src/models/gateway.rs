//! Top-level gateway configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use super::api::ApiDefinition;
use crate::error::ConfigError;

/// Header names the gateway reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct HeaderNames {
    #[validate(length(min = 1_u64))]
    #[serde(default = "default_transaction_id_header")]
    pub transaction_id: String,
    #[validate(length(min = 1_u64))]
    #[serde(default = "default_request_id_header")]
    pub request_id: String,
    #[validate(length(min = 1_u64))]
    #[serde(default = "default_api_key_header")]
    pub api_key: String,
}

impl Default for HeaderNames {
    fn default() -> Self {
        Self {
            transaction_id: default_transaction_id_header(),
            request_id: default_request_id_header(),
            api_key: default_api_key_header(),
        }
    }
}

/// Bounds of the circuit breaker state store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct BreakerCacheConfig {
    #[validate(range(min = 1_usize))]
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Closed breakers untouched for this long are evicted
    #[validate(range(min = 1_u64))]
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
    #[validate(range(min = 1_u64))]
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for BreakerCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            idle_ttl_secs: default_idle_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl BreakerCacheConfig {
    pub const fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[validate(range(min = 1_u16))]
    #[serde(default = "default_port")]
    pub port: u16,
    #[validate(range(min = 1_usize))]
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[validate(range(min = 1_u64))]
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[validate(nested)]
    #[serde(default)]
    pub headers: HeaderNames,
    #[validate(nested)]
    #[serde(default)]
    pub breaker_cache: BreakerCacheConfig,
    #[validate(nested)]
    #[serde(default)]
    pub apis: Vec<ApiDefinition>,
    /// Directory of additional `*.json` API definitions
    #[serde(default)]
    pub apis_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
            connect_timeout_ms: default_connect_timeout_ms(),
            headers: HeaderNames::default(),
            breaker_cache: BreakerCacheConfig::default(),
            apis: Vec::new(),
            apis_dir: None,
        }
    }
}

impl GatewayConfig {
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate the whole configuration, including every API definition.
    pub fn validate_all(&self) -> Result<(), ConfigError> {
        self.validate()?;

        let mut ids = HashSet::new();
        let mut paths = HashSet::new();
        for api in &self.apis {
            api.validate_definition()?;
            if !ids.insert(api.id.as_str()) {
                return Err(ConfigError::invalid("apis", format!("duplicate api id '{}'", api.id)));
            }
            if !paths.insert(api.context_path.trim_end_matches('/')) {
                return Err(ConfigError::invalid(
                    "apis",
                    format!("duplicate context path '{}'", api.context_path),
                ));
            }
        }
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8082
}

const fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

const fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_transaction_id_header() -> String {
    "X-Transaction-Id".to_string()
}

fn default_request_id_header() -> String {
    "X-Request-Id".to_string()
}

fn default_api_key_header() -> String {
    "X-Api-Key".to_string()
}

const fn default_max_entries() -> usize {
    10_000
}

const fn default_idle_ttl_secs() -> u64 {
    3600
}

const fn default_sweep_interval_secs() -> u64 {
    60
}

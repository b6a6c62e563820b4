//! API definitions as deployed on the gateway.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use url::Url;
use validator::Validate;

use super::endpoint::{ConnectorKind, EndpointConfig, EndpointGroupConfig};
use super::failover::FailoverConfig;
use super::routing::RoutingRule;
use crate::error::ConfigError;

/// Flavour of API exposed by the entrypoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiKind {
    /// Request/response proxying
    #[default]
    Proxy,
    /// Message consumption over a long-lived HTTP response
    Message,
}

impl fmt::Display for ApiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Proxy => write!(f, "proxy"),
            Self::Message => write!(f, "message"),
        }
    }
}

/// Maps an API key presented by a caller to its subscription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct ApiKeySubscription {
    #[validate(length(min = 1_u64))]
    #[serde(alias = "apiKey")]
    pub api_key: String,
    #[validate(length(min = 1_u64))]
    #[serde(alias = "subscriptionId", alias = "subscription")]
    pub subscription_id: String,
}

/// Limits of the HTTP GET entrypoint of a message API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct MessageEntrypointConfig {
    /// Stop after this many messages; a `limit` query parameter can lower it
    #[serde(default = "default_limit_count", alias = "messagesLimitCount")]
    pub limit_count: u32,
    /// Stop after this many milliseconds (0 disables the bound)
    #[serde(default = "default_limit_duration_ms", alias = "messagesLimitDurationMs")]
    pub limit_duration_ms: u64,
}

impl Default for MessageEntrypointConfig {
    fn default() -> Self {
        Self { limit_count: default_limit_count(), limit_duration_ms: default_limit_duration_ms() }
    }
}

const fn default_limit_count() -> u32 {
    500
}

const fn default_limit_duration_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct ApiDefinition {
    #[validate(length(min = 1_u64))]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[validate(length(min = 1_u64))]
    #[serde(alias = "contextPath")]
    pub context_path: String,
    #[serde(default, rename = "type")]
    pub kind: ApiKind,
    #[validate(length(min = 1_u64), nested)]
    #[serde(alias = "endpointGroups")]
    pub endpoint_groups: Vec<EndpointGroupConfig>,
    #[validate(nested)]
    #[serde(default)]
    pub failover: FailoverConfig,
    #[validate(nested)]
    #[serde(default)]
    pub routing: Vec<RoutingRule>,
    #[validate(nested)]
    #[serde(default)]
    pub subscriptions: Vec<ApiKeySubscription>,
    #[serde(default)]
    pub message: MessageEntrypointConfig,
}

impl ApiDefinition {
    /// Field validation plus the cross-field rules a derive cannot express.
    pub fn validate_definition(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if !self.context_path.starts_with('/') {
            return Err(ConfigError::invalid(
                format!("{}.context_path", self.id),
                "must start with '/'",
            ));
        }

        let mut names = HashSet::new();
        for group in &self.endpoint_groups {
            if !names.insert(group.name.as_str()) {
                return Err(ConfigError::invalid(
                    format!("{}.endpoint_groups", self.id),
                    format!("duplicate name '{}'", group.name),
                ));
            }
            for endpoint in &group.endpoints {
                if !names.insert(endpoint.name.as_str()) {
                    return Err(ConfigError::invalid(
                        format!("{}.endpoints", self.id),
                        format!("duplicate name '{}'", endpoint.name),
                    ));
                }
                self.check_endpoint(endpoint)?;
            }
        }

        for rule in &self.routing {
            if !names.contains(rule.target.as_str()) {
                return Err(ConfigError::invalid(
                    format!("{}.routing", self.id),
                    format!("unknown target '{}'", rule.target),
                ));
            }
        }

        let mut keys = HashSet::new();
        for sub in &self.subscriptions {
            if !keys.insert(sub.api_key.as_str()) {
                return Err(ConfigError::invalid(
                    format!("{}.subscriptions", self.id),
                    "duplicate api_key",
                ));
            }
        }

        Ok(())
    }

    fn check_endpoint(&self, endpoint: &EndpointConfig) -> Result<(), ConfigError> {
        let field = format!("{}.{}.target", self.id, endpoint.name);
        let url = Url::parse(&endpoint.target)
            .map_err(|e| ConfigError::invalid(field.clone(), e.to_string()))?;

        match (self.kind, endpoint.connector) {
            (ApiKind::Proxy, ConnectorKind::HttpProxy) => {
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(ConfigError::invalid(field, "http_proxy needs an http(s) URL"));
                }
            },
            (ApiKind::Message, kind) if kind.is_message() => {},
            (kind, connector) => {
                return Err(ConfigError::invalid(
                    format!("{}.{}.type", self.id, endpoint.name),
                    format!("connector '{connector}' not usable by a {kind} API"),
                ));
            },
        }
        Ok(())
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoint_groups.iter().map(|g| g.endpoints.len()).sum()
    }

    /// Subscription id bound to `api_key`, if any.
    pub fn subscription_for(&self, api_key: &str) -> Option<&str> {
        self.subscriptions
            .iter()
            .find(|s| s.api_key == api_key)
            .map(|s| s.subscription_id.as_str())
    }
}

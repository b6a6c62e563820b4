//! Endpoint and endpoint group configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Load-balancing strategy of an endpoint group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancerKind {
    #[default]
    #[serde(alias = "round-robin", alias = "ROUND_ROBIN")]
    RoundRobin,
    #[serde(alias = "RANDOM")]
    Random,
    #[serde(alias = "weighted-round-robin", alias = "WEIGHTED_ROUND_ROBIN")]
    WeightedRoundRobin,
    #[serde(alias = "weighted-random", alias = "WEIGHTED_RANDOM")]
    WeightedRandom,
}

impl fmt::Display for LoadBalancerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::RoundRobin => write!(f, "round_robin"),
            Self::Random => write!(f, "random"),
            Self::WeightedRoundRobin => write!(f, "weighted_round_robin"),
            Self::WeightedRandom => write!(f, "weighted_random"),
        }
    }
}

/// Transport used to reach an endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    /// Request/response HTTP proxying
    #[default]
    #[serde(alias = "http-proxy")]
    HttpProxy,
    /// Message source over Server-Sent Events
    Sse,
    /// Built-in generated message source
    Mock,
}

impl ConnectorKind {
    /// Whether the connector produces a message stream rather than one response.
    pub const fn is_message(self) -> bool {
        matches!(self, Self::Sse | Self::Mock)
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::HttpProxy => write!(f, "http_proxy"),
            Self::Sse => write!(f, "sse"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

/// Settings of the built-in mock message source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct MockMessageConfig {
    #[serde(default = "default_mock_content", alias = "messageContent")]
    pub message_content: String,
    /// `None` produces an endless stream
    #[serde(default, alias = "messageCount")]
    pub message_count: Option<u32>,
    #[serde(default = "default_mock_interval_ms", alias = "messageInterval")]
    pub message_interval_ms: u64,
}

impl Default for MockMessageConfig {
    fn default() -> Self {
        Self {
            message_content: default_mock_content(),
            message_count: None,
            message_interval_ms: default_mock_interval_ms(),
        }
    }
}

/// A single backend target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct EndpointConfig {
    #[validate(length(min = 1_u64))]
    pub name: String,
    /// Absolute URL of the backend (`http(s)://`, or any scheme for message sources)
    #[validate(length(min = 1_u64))]
    pub target: String,
    #[validate(range(min = 1_u32))]
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default, rename = "type", alias = "connector")]
    pub connector: ConnectorKind,
    #[serde(default)]
    #[validate(nested)]
    pub mock: Option<MockMessageConfig>,
}

/// Load-balanced set of endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct EndpointGroupConfig {
    #[validate(length(min = 1_u64))]
    pub name: String,
    #[serde(default, alias = "loadBalancer")]
    pub load_balancer: LoadBalancerKind,
    #[validate(length(min = 1_u64), nested)]
    pub endpoints: Vec<EndpointConfig>,
}

const fn default_weight() -> u32 {
    1
}

fn default_mock_content() -> String {
    "mock message".to_string()
}

const fn default_mock_interval_ms() -> u64 {
    1000
}

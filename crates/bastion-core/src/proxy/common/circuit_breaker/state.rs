//! Circuit breaker state types and policy

use bastion_types::FailoverConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Scope shared by callers without a subscription
pub const GLOBAL_SCOPE: &str = "global";

/// Identity of one breaker: (API, endpoint group, scope)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CircuitBreakerKey {
    pub api_id: String,
    pub group: String,
    pub scope: String,
}

impl CircuitBreakerKey {
    pub fn new(api_id: &str, group: &str, subscription: Option<&str>) -> Self {
        Self {
            api_id: api_id.to_string(),
            group: group.to_string(),
            scope: subscription.unwrap_or(GLOBAL_SCOPE).to_string(),
        }
    }
}

impl fmt::Display for CircuitBreakerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.api_id, self.group, self.scope)
    }
}

/// Thresholds applied to a breaker, taken from the API's failover policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerPolicy {
    /// Consecutive failures before opening the circuit
    pub max_failures: u32,
    /// Duration to keep circuit open before trying half-open
    pub open_duration: Duration,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self { max_failures: 5, open_duration: Duration::from_secs(10) }
    }
}

impl From<&FailoverConfig> for BreakerPolicy {
    fn from(config: &FailoverConfig) -> Self {
        Self { max_failures: config.max_failures, open_duration: config.open_state_duration() }
    }
}

/// State of the circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - requests pass through
    Closed,
    /// Backend is failing - requests fail immediately
    Open,
    /// Testing recovery - a single probe is allowed
    HalfOpen,
}

impl CircuitState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug)]
pub(crate) struct Circuit {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub opened_at: Option<Instant>,
    pub probe_started_at: Option<Instant>,
    pub last_used: Instant,
    pub last_failure_reason: Option<String>,
    pub last_transition: DateTime<Utc>,
}

impl Circuit {
    pub fn new(now: Instant) -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            probe_started_at: None,
            last_used: now,
            last_failure_reason: None,
            last_transition: Utc::now(),
        }
    }

    pub fn transition(&mut self, to: CircuitState) {
        self.state = to;
        self.last_transition = Utc::now();
    }
}

/// Point-in-time view of one breaker
#[derive(Debug, Clone, Serialize)]
pub struct CircuitSnapshot {
    #[serde(flatten)]
    pub key: CircuitBreakerKey,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub last_failure_reason: Option<String>,
    pub last_transition: DateTime<Utc>,
}

/// Summary of circuit breaker states across all keys
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerSummary {
    pub closed: usize,
    pub open: usize,
    pub half_open: usize,
    pub total_trips: u64,
}

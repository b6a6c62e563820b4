//! Failover and circuit breaker policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use validator::Validate;

/// How a slow backend call is detected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlowCallMode {
    /// Race the call against a timer; at the deadline the attempt is abandoned
    /// (the call keeps running in the background, its result is discarded).
    #[default]
    Race,
    /// Await the call and measure elapsed time afterwards. A slow success is
    /// still forwarded when no retry budget remains.
    Measure,
}

impl fmt::Display for SlowCallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Race => write!(f, "race"),
            Self::Measure => write!(f, "measure"),
        }
    }
}

/// Failover policy attached to an API and shared by all of its endpoint groups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct FailoverConfig {
    /// Disabled failover means one attempt, no slow-call detection, no breaker
    #[serde(default)]
    pub enabled: bool,
    /// Retries after the first attempt
    #[validate(range(max = 64_u32))]
    #[serde(default = "default_max_retries", alias = "maxRetries")]
    pub max_retries: u32,
    /// Calls lasting at least this long count as failures
    #[validate(range(min = 1_u64))]
    #[serde(default = "default_slow_call_duration_ms", alias = "slowCallDuration")]
    pub slow_call_duration_ms: u64,
    /// Time the breaker stays open before admitting a probe
    #[validate(range(min = 1_u64))]
    #[serde(default = "default_open_state_duration_ms", alias = "openStateDuration")]
    pub open_state_duration_ms: u64,
    /// Consecutive failures before the breaker opens
    #[validate(range(min = 1_u32))]
    #[serde(default = "default_max_failures", alias = "maxFailures")]
    pub max_failures: u32,
    /// Scope breakers per subscription instead of per API
    #[serde(default = "default_true", alias = "perSubscription")]
    pub per_subscription: bool,
    #[serde(default, alias = "slowCallMode")]
    pub slow_call_mode: SlowCallMode,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retries: default_max_retries(),
            slow_call_duration_ms: default_slow_call_duration_ms(),
            open_state_duration_ms: default_open_state_duration_ms(),
            max_failures: default_max_failures(),
            per_subscription: true,
            slow_call_mode: SlowCallMode::default(),
        }
    }
}

impl FailoverConfig {
    pub const fn slow_call_duration(&self) -> Duration {
        Duration::from_millis(self.slow_call_duration_ms)
    }

    pub const fn open_state_duration(&self) -> Duration {
        Duration::from_millis(self.open_state_duration_ms)
    }

    /// Total connector invocations allowed for one request.
    pub const fn max_attempts(&self) -> u32 {
        if self.enabled {
            self.max_retries.saturating_add(1)
        } else {
            1
        }
    }
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_slow_call_duration_ms() -> u64 {
    2000
}

const fn default_open_state_duration_ms() -> u64 {
    10_000
}

const fn default_max_failures() -> u32 {
    5
}

const fn default_true() -> bool {
    true
}

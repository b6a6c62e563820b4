//! Circuit breakers for (API, endpoint group, scope) fast-fail behavior
//!
//! When an endpoint group keeps failing for a given scope, its breaker opens
//! and subsequent requests are rejected without contacting the backend.
//!
//! States:
//! - Closed: Normal operation, requests pass through
//! - Open: Group is failing, requests fail immediately
//! - Half-Open: One probe request tests whether the group recovered
//!
//! Breakers are created lazily and held in a bounded store: least recently
//! used entries are evicted past `max_entries`, and closed entries idle for
//! longer than `idle_ttl` are swept by a background task.

mod clock;
mod recording;
mod state;


pub use clock::{Clock, ManualClock, SystemClock};
pub use state::{
    BreakerPolicy, CircuitBreakerKey, CircuitBreakerSummary, CircuitSnapshot, CircuitState,
    GLOBAL_SCOPE,
};
use state::Circuit;

use bastion_types::BreakerCacheConfig;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Manages circuit breakers for every deployed API
#[derive(Debug)]
pub struct CircuitBreakerManager {
    cache: BreakerCacheConfig,
    clock: Arc<dyn Clock>,
    circuits: DashMap<CircuitBreakerKey, Circuit>,
    total_trips: AtomicU64,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
}

impl Default for CircuitBreakerManager {
    fn default() -> Self {
        Self::new(BreakerCacheConfig::default())
    }
}

impl CircuitBreakerManager {
    pub fn new(cache: BreakerCacheConfig) -> Self {
        Self::with_clock(cache, Arc::new(SystemClock))
    }

    pub fn with_clock(cache: BreakerCacheConfig, clock: Arc<dyn Clock>) -> Self {
        let (shutdown_tx, _) = tokio::sync::watch::channel(false);
        Self { cache, clock, circuits: DashMap::new(), total_trips: AtomicU64::new(0), shutdown_tx }
    }

    /// Check if a request should be allowed through the breaker of `key`.
    ///
    /// Returns `Ok(())` if the request can proceed, `Err(Duration)` with the
    /// remaining cool-down if it must be rejected. An open breaker whose
    /// cool-down elapsed moves to half-open and admits exactly one probe; a
    /// probe that never reports back is superseded after another cool-down.
    pub fn should_allow(&self, key: &CircuitBreakerKey, policy: &BreakerPolicy) -> Result<(), Duration> {
        let now = self.clock.now();
        if !self.circuits.contains_key(key) {
            self.make_room();
        }
        let mut circuit = self.circuits.entry(key.clone()).or_insert_with(|| Circuit::new(now));
        circuit.last_used = now;

        match circuit.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let opened_at = circuit.opened_at.unwrap_or(now);
                let elapsed = now.saturating_duration_since(opened_at);
                if elapsed < policy.open_duration {
                    return Err(policy.open_duration.saturating_sub(elapsed));
                }
                debug!(circuit = %key, "Circuit breaker transitioning to half-open");
                circuit.transition(CircuitState::HalfOpen);
                circuit.probe_started_at = Some(now);
                Self::persist_state_change(
                    key,
                    CircuitState::Open,
                    CircuitState::HalfOpen,
                    Some("Timeout elapsed, testing recovery"),
                );
                Ok(())
            },
            CircuitState::HalfOpen => match circuit.probe_started_at {
                Some(started) if now.saturating_duration_since(started) < policy.open_duration => {
                    Err(policy.open_duration.saturating_sub(now.saturating_duration_since(started)))
                },
                _ => {
                    debug!(circuit = %key, "Superseding stale half-open probe");
                    circuit.probe_started_at = Some(now);
                    Ok(())
                },
            },
        }
    }

    fn persist_state_change(
        key: &CircuitBreakerKey,
        previous_state: CircuitState,
        new_state: CircuitState,
        reason: Option<&str>,
    ) {
        info!(
            circuit = %key,
            from = previous_state.as_str(),
            to = new_state.as_str(),
            reason = reason.unwrap_or(""),
            "Circuit breaker state change"
        );
    }

    pub fn get_state(&self, key: &CircuitBreakerKey) -> CircuitState {
        self.circuits.get(key).map_or(CircuitState::Closed, |c| c.state)
    }

    pub fn total_trips(&self) -> u64 {
        self.total_trips.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.circuits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
    }

    /// Drop every breaker of `api_id`; called when the API is undeployed or replaced.
    pub fn forget_api(&self, api_id: &str) -> usize {
        let before = self.circuits.len();
        self.circuits.retain(|key, _| key.api_id != api_id);
        let removed = before.saturating_sub(self.circuits.len());
        if removed > 0 {
            debug!(api_id = %api_id, removed, "Dropped circuit breakers of API");
        }
        removed
    }

    /// Evict closed breakers that have not been used for `idle_ttl`.
    pub fn sweep_idle(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.cache.idle_ttl();
        let before = self.circuits.len();
        self.circuits.retain(|_, circuit| {
            circuit.state != CircuitState::Closed
                || now.saturating_duration_since(circuit.last_used) < ttl
        });
        before.saturating_sub(self.circuits.len())
    }

    /// Evict least recently used entries so that one more fits.
    ///
    /// Closed breakers go first; open ones are only evicted when nothing else is left.
    fn make_room(&self) {
        while self.circuits.len() >= self.cache.max_entries {
            let victim = self
                .circuits
                .iter()
                .min_by_key(|entry| (entry.value().state != CircuitState::Closed, entry.value().last_used))
                .map(|entry| entry.key().clone());
            match victim {
                Some(key) => {
                    debug!(circuit = %key, "Evicting circuit breaker (store full)");
                    self.circuits.remove(&key);
                },
                None => break,
            }
        }
    }

    /// Start the background idle sweeper
    pub fn start_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let interval = self.cache.sweep_interval();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = tokio::time::sleep(interval) => {
                        let evicted = manager.sweep_idle();
                        if evicted > 0 {
                            debug!(evicted, "Swept idle circuit breakers");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Circuit breaker sweeper shutting down");
                        break;
                    }
                }
            }
        })
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn snapshot(&self) -> Vec<CircuitSnapshot> {
        let mut snapshots: Vec<CircuitSnapshot> = self
            .circuits
            .iter()
            .map(|entry| CircuitSnapshot {
                key: entry.key().clone(),
                state: entry.value().state,
                consecutive_failures: entry.value().consecutive_failures,
                last_failure_reason: entry.value().last_failure_reason.clone(),
                last_transition: entry.value().last_transition,
            })
            .collect();
        snapshots.sort_by(|a, b| a.key.cmp(&b.key));
        snapshots
    }

    pub fn get_summary(&self) -> CircuitBreakerSummary {
        let mut closed = 0;
        let mut open = 0;
        let mut half_open = 0;

        for entry in &self.circuits {
            match entry.value().state {
                CircuitState::Closed => closed += 1,
                CircuitState::Open => open += 1,
                CircuitState::HalfOpen => half_open += 1,
            }
        }

        CircuitBreakerSummary { closed, open, half_open, total_trips: self.total_trips() }
    }
}

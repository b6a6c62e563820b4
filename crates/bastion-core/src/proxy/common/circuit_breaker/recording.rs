use super::state::{BreakerPolicy, Circuit, CircuitBreakerKey, CircuitState};
use super::CircuitBreakerManager;
use crate::proxy::prometheus;
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

impl CircuitBreakerManager {
    pub fn record_success(&self, key: &CircuitBreakerKey) {
        let now = self.clock.now();
        if !self.circuits.contains_key(key) {
            self.make_room();
        }
        let mut circuit = self.circuits.entry(key.clone()).or_insert_with(|| Circuit::new(now));
        circuit.last_used = now;

        match circuit.state {
            CircuitState::Closed => {
                circuit.consecutive_failures = 0;
            },
            CircuitState::HalfOpen => {
                info!(circuit = %key, "Circuit breaker closing - probe succeeded");
                circuit.transition(CircuitState::Closed);
                circuit.consecutive_failures = 0;
                circuit.opened_at = None;
                circuit.probe_started_at = None;
                circuit.last_failure_reason = None;

                Self::persist_state_change(
                    key,
                    CircuitState::HalfOpen,
                    CircuitState::Closed,
                    Some("Probe succeeded"),
                );
            },
            CircuitState::Open => {
                debug!(circuit = %key, "Unexpected success in open state");
            },
        }
    }

    /// Count a failed, or slow, call against the breaker of `key`.
    pub fn record_failure(&self, key: &CircuitBreakerKey, reason: &str, policy: &BreakerPolicy) {
        let now = self.clock.now();
        if !self.circuits.contains_key(key) {
            self.make_room();
        }
        let mut circuit = self.circuits.entry(key.clone()).or_insert_with(|| Circuit::new(now));
        circuit.last_used = now;

        let previous_state = circuit.state;
        if previous_state == CircuitState::Open {
            // Late result of an attempt abandoned before the breaker opened
            debug!(circuit = %key, reason = %reason, "Ignoring failure in open state");
            return;
        }
        circuit.consecutive_failures = circuit.consecutive_failures.saturating_add(1);
        circuit.last_failure_reason = Some(reason.to_string());

        match previous_state {
            CircuitState::Closed => {
                if circuit.consecutive_failures >= policy.max_failures {
                    warn!(
                        circuit = %key,
                        failures = circuit.consecutive_failures,
                        reason = %reason,
                        "Circuit breaker opening - too many failures"
                    );
                    circuit.transition(CircuitState::Open);
                    circuit.opened_at = Some(now);
                    self.total_trips.fetch_add(1, Ordering::Relaxed);
                    prometheus::record_circuit_trip();

                    Self::persist_state_change(key, previous_state, CircuitState::Open, Some(reason));
                }
            },
            CircuitState::HalfOpen => {
                warn!(
                    circuit = %key,
                    reason = %reason,
                    "Circuit breaker re-opening - probe failed"
                );
                circuit.transition(CircuitState::Open);
                circuit.opened_at = Some(now);
                circuit.probe_started_at = None;
                self.total_trips.fetch_add(1, Ordering::Relaxed);
                prometheus::record_circuit_trip();

                Self::persist_state_change(key, previous_state, CircuitState::Open, Some(reason));
            },
            CircuitState::Open => {},
        }
    }
}

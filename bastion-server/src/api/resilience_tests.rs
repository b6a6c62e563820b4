use axum::extract::State;
use axum::response::Json;

use bastion_core::proxy::{BreakerPolicy, CircuitBreakerKey, CircuitState};

use super::resilience::{get_circuit_status, get_metrics};
use crate::test_helpers::test_app_state;

#[tokio::test]
async fn test_get_circuit_status_empty() {
    let (state, _tmp) = test_app_state();
    let Json(response) = get_circuit_status(State(state)).await;
    assert!(response.circuits.is_empty());
    assert_eq!(response.summary.open, 0);
    assert_eq!(response.summary.total_trips, 0);
}

#[tokio::test]
async fn test_get_circuit_status_reports_open_circuit() {
    let (state, _tmp) = test_app_state();
    let key = CircuitBreakerKey::new("orders", "default-group", Some("subscription-1"));
    let policy = BreakerPolicy { max_failures: 1, ..BreakerPolicy::default() };
    state.circuit_breaker().record_failure(&key, "connect failure", &policy);

    let Json(response) = get_circuit_status(State(state)).await;
    assert_eq!(response.circuits.len(), 1);
    assert_eq!(response.circuits[0].state, CircuitState::Open);
    assert_eq!(response.circuits[0].key.scope, "subscription-1");
    assert_eq!(response.summary.open, 1);
    assert_eq!(response.summary.total_trips, 1);
}

#[tokio::test]
async fn test_get_metrics_is_prometheus_text() {
    let (state, _tmp) = test_app_state();
    let response = get_metrics(State(state)).await;
    let content_type = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/plain"));
}

//! Ops API Routes
//!
//! Read-only views over the deployed APIs and the circuit breakers.

mod apis;
pub mod resilience;

#[cfg(test)]
mod apis_tests;
#[cfg(test)]
mod resilience_tests;

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/apis", get(apis::list_apis))
        .route("/apis/:api_id", get(apis::get_api))
        .route("/circuits", get(resilience::get_circuit_status))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub uptime_secs: u64,
    pub deployed_apis: usize,
    pub tracked_circuits: usize,
    pub config_path: String,
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.uptime_secs(),
        deployed_apis: state.registry().len(),
        tracked_circuits: state.circuit_breaker().len(),
        config_path: state.config_path().display().to_string(),
    })
}

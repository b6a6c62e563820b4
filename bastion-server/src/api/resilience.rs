use axum::{extract::State, response::Json};
use bastion_core::proxy::{CircuitBreakerSummary, CircuitSnapshot};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct CircuitStatusResponse {
    pub summary: CircuitBreakerSummary,
    pub circuits: Vec<CircuitSnapshot>,
}

pub async fn get_circuit_status(State(state): State<AppState>) -> Json<CircuitStatusResponse> {
    let circuit_breaker = state.circuit_breaker();

    Json(CircuitStatusResponse {
        summary: circuit_breaker.get_summary(),
        circuits: circuit_breaker.snapshot(),
    })
}

pub async fn get_metrics(State(state): State<AppState>) -> axum::response::Response<axum::body::Body> {
    use axum::http::header;
    use axum::response::IntoResponse;
    use bastion_core::proxy::prometheus;

    prometheus::update_deployed_gauge(state.registry().len());
    prometheus::update_uptime_gauge();
    let metrics = prometheus::render_metrics();

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")], metrics).into_response()
}

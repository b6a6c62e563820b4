// Gateway entrypoint handlers

pub mod message;
pub mod proxy;

use axum::extract::{Request, State};
use axum::response::Response;
use bastion_types::ApiKind;
use std::time::Instant;

use crate::proxy::prometheus;
use crate::proxy::response::error_response;
use crate::proxy::server::AppState;

/// Fallback handler: every path not served by the router goes through the
/// deployed APIs.
pub async fn handle_request(State(state): State<AppState>, request: Request) -> Response {
    let started = Instant::now();
    let gateway = &state.gateway;
    let ids = gateway.ids(request.headers());

    let resolved =
        match gateway.resolve(request.uri().path(), request.uri().query(), request.headers()) {
            Ok(resolved) => resolved,
            Err(error) => {
                tracing::debug!(path = %request.uri().path(), trace_id = %ids.transaction_id, "No API for path");
                return error_response(&error, &ids, gateway.headers());
            },
        };

    let api_id = resolved.api.id().to_string();
    let response = match resolved.api.definition.kind {
        ApiKind::Proxy => proxy::forward(gateway, resolved, ids, request).await,
        ApiKind::Message => message::subscribe(gateway, resolved, ids, request).await,
    };

    prometheus::record_request(&api_id, response.status().as_u16(), started.elapsed());
    response
}

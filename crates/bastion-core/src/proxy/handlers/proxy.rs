//! Request/response proxying with failover.

use axum::extract::Request;
use axum::http::HeaderMap;
use axum::response::Response;
use std::sync::Arc;
use tracing::info;

use crate::proxy::common::header_constants::{is_hop_by_hop, is_recomputed_request_header};
use crate::proxy::connector::BackendRequest;
use crate::proxy::gateway::{Gateway, GatewayIds, ResolvedRequest};
use crate::proxy::response::{assemble, error_response};
use crate::proxy::retry::ReplayBody;
use crate::proxy::routing::{RouteDecision, RouteRequest};

/// Caller headers forwarded on every attempt.
pub fn forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if is_hop_by_hop(name) || is_recomputed_request_header(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

pub async fn forward(
    gateway: &Gateway,
    resolved: ResolvedRequest,
    ids: GatewayIds,
    request: Request,
) -> Response {
    let names = gateway.headers();
    let (parts, body) = request.into_parts();

    let body = match ReplayBody::read(body, gateway.max_body_bytes()).await {
        Ok(body) => body,
        Err(error) => return error_response(&error, &ids, names),
    };

    let api = &resolved.api;
    let decision = api.router().route(&RouteRequest {
        method: &parts.method,
        path: &resolved.path,
        headers: &parts.headers,
    });
    let target = match api.target(&decision) {
        Ok(target) => target,
        Err(error) => return error_response(&error, &ids, names),
    };
    let path = match decision {
        RouteDecision::Endpoint { path: Some(path), .. }
        | RouteDecision::Group { path: Some(path), .. } => path,
        _ => resolved.path.clone(),
    };

    let mut headers = forwarded_headers(&parts.headers);
    ids.apply(&mut headers, names);

    let backend_request = Arc::new(BackendRequest {
        method: parts.method,
        path,
        query: parts.uri.query().map(str::to_string),
        headers,
        body,
    });

    let ctx = resolved.retry_context(&ids);
    let http = Arc::clone(&gateway.connectors().http);
    let result = gateway
        .coordinator()
        .execute(&ctx, &target, move |endpoint| {
            let http = Arc::clone(&http);
            let request = Arc::clone(&backend_request);
            async move { http.send(&endpoint, &request).await }
        })
        .await;

    match result {
        Ok(delivered) => {
            if delivered.attempts.len() > 1 {
                info!(
                    api_id = %ctx.api_id,
                    endpoint = %delivered.endpoint.name,
                    attempts = delivered.attempts.len(),
                    trace_id = %ids.transaction_id,
                    "Delivered after retry"
                );
            }
            assemble(delivered.value, &ids, names)
        },
        Err(error) => error_response(&error, &ids, names),
    }
}

//! Client response assembly.
//!
//! Exactly one attempt's response reaches the caller: status, headers and body
//! come from the winning attempt and nothing from abandoned attempts is merged.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bastion_types::ProxyError;
use serde_json::json;

use super::common::header_constants::is_hop_by_hop;
use super::connector::{BackendResponse, ResponseBody};
use super::gateway::{GatewayHeaders, GatewayIds};

/// Build the client response from the winning attempt.
pub fn assemble(backend: BackendResponse, ids: &GatewayIds, names: &GatewayHeaders) -> Response {
    let BackendResponse { status, headers, body } = backend;

    let mut response = match body {
        ResponseBody::Full(bytes) => Response::new(Body::from(bytes)),
        ResponseBody::Stream(stream) => Response::new(Body::from_stream(stream)),
    };
    *response.status_mut() = status;

    let out = response.headers_mut();
    for (name, value) in &headers {
        if is_hop_by_hop(name) {
            continue;
        }
        if name == header::CONTENT_LENGTH {
            // insert, never append: one Content-Length from this attempt only
            out.insert(header::CONTENT_LENGTH, value.clone());
        } else {
            out.append(name.clone(), value.clone());
        }
    }
    ids.apply(out, names);
    response
}

/// JSON error body for a request that produced no backend response.
pub fn error_response(error: &ProxyError, ids: &GatewayIds, names: &GatewayHeaders) -> Response {
    let status =
        StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = json!({
        "error": status.canonical_reason().unwrap_or("Error"),
        "message": error.to_string(),
        "transaction_id": ids.transaction_id,
    });
    let mut response = (status, Json(body)).into_response();
    ids.apply(response.headers_mut(), names);
    response
}

/// Plain status response with the gateway ids, for requests rejected before routing.
pub fn status_response(status: StatusCode, ids: &GatewayIds, names: &GatewayHeaders) -> Response {
    let mut response = status.into_response();
    response.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
    ids.apply(response.headers_mut(), names);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use bastion_types::HeaderNames;
    use bytes::Bytes;

    fn names() -> GatewayHeaders {
        GatewayHeaders::parse(&HeaderNames::default()).expect("valid names")
    }

    fn ids() -> GatewayIds {
        GatewayIds { transaction_id: "tx".to_string(), request_id: "rq".to_string() }
    }

    #[test]
    fn test_assemble_keeps_single_content_length_and_strips_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("5"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert("x-backend", HeaderValue::from_static("endpoint-1"));

        let response = assemble(
            BackendResponse {
                status: StatusCode::OK,
                headers,
                body: ResponseBody::Full(Bytes::from_static(b"hello")),
            },
            &ids(),
            &names(),
        );

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get_all(header::CONTENT_LENGTH).iter().count(), 1);
        assert!(response.headers().get(header::CONNECTION).is_none());
        assert_eq!(response.headers().get("x-backend").map(HeaderValue::as_bytes), Some(&b"endpoint-1"[..]));
        assert_eq!(response.headers().get("x-request-id").map(HeaderValue::as_bytes), Some(&b"rq"[..]));
    }

    #[test]
    fn test_error_response_uses_error_status() {
        let error = ProxyError::CircuitOpen { api_id: "a".to_string(), group: "g".to_string() };
        let response = error_response(&error, &ids(), &names());
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().get("x-transaction-id").is_some());
    }
}

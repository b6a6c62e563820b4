//! Standard HTTP header names used across proxy handlers.

use axum::http::HeaderName;

/// Query parameter accepted as an alternative to the API key header.
pub const API_KEY_QUERY_PARAM: &str = "api-key";
/// Query parameter capping the number of messages of a message API response.
pub const LIMIT_QUERY_PARAM: &str = "limit";

/// Connection-scoped headers that are never forwarded in either direction.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

/// Request headers the HTTP client recomputes for every attempt.
pub fn is_recomputed_request_header(name: &HeaderName) -> bool {
    matches!(name.as_str(), "host" | "content-length")
}

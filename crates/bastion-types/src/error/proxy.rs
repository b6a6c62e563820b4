//! Proxy-related errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while proxying a request.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ProxyError {
    /// Transport-level failure reaching an endpoint (DNS, TCP refusal, TLS)
    #[error("Connection to endpoint {endpoint} failed: {message}")]
    ConnectFailure { endpoint: String, message: String },

    /// Endpoint reachable but the call itself failed
    #[error("Call to endpoint {endpoint} failed: {message}")]
    CallFailure { endpoint: String, message: String },

    /// Endpoint did not answer within the slow-call threshold
    #[error("Endpoint {endpoint} exceeded slow call threshold of {threshold_ms}ms")]
    SlowCall { endpoint: String, threshold_ms: u64 },

    /// Circuit breaker is open, the backend was not contacted
    #[error("Circuit breaker open for {api_id}/{group}")]
    CircuitOpen { api_id: String, group: String },

    /// Every attempt of the retry budget failed
    #[error("All {attempts} attempts failed, last error: {last_error}")]
    BudgetExhausted { attempts: u32, last_error: String },

    /// No endpoint could be selected from the target group
    #[error("No endpoint available in group {group}")]
    NoEndpoint { group: String },

    /// A routing decision named an endpoint or group that does not exist
    #[error("Unknown routing target: {name}")]
    UnknownTarget { name: String },

    /// No deployed API matches the request path
    #[error("No API deployed for path {path}")]
    ApiNotFound { path: String },

    /// Request body exceeded the configured limit
    #[error("Request body exceeds {limit_bytes} bytes")]
    PayloadTooLarge { limit_bytes: usize },

    /// Request validation failed
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

impl ProxyError {
    /// Get HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::ConnectFailure { .. }
            | Self::CallFailure { .. }
            | Self::SlowCall { .. }
            | Self::CircuitOpen { .. }
            | Self::BudgetExhausted { .. } => 502,
            Self::NoEndpoint { .. } => 503,
            Self::UnknownTarget { .. } => 500,
            Self::ApiNotFound { .. } => 404,
            Self::PayloadTooLarge { .. } => 413,
            Self::InvalidRequest { .. } => 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            ProxyError::CircuitOpen { api_id: "a".to_string(), group: "g".to_string() }
                .http_status_code(),
            502
        );
        assert_eq!(
            ProxyError::BudgetExhausted { attempts: 3, last_error: "x".to_string() }
                .http_status_code(),
            502
        );
        assert_eq!(ProxyError::ApiNotFound { path: "/nope".to_string() }.http_status_code(), 404);
        assert_eq!(ProxyError::PayloadTooLarge { limit_bytes: 10 }.http_status_code(), 413);
    }

    #[test]
    fn test_unreadable_body_is_bad_request() {
        let error = ProxyError::InvalidRequest { message: "connection reset".to_string() };
        assert_eq!(error.http_status_code(), 400);
    }
}

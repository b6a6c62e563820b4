//! Request orchestration shared by the proxy and message handlers.
//!
//! The gateway resolves the deployed API from the request path, derives the
//! transaction/request ids and the caller's subscription, and owns the
//! connector set and the retry coordinator every handler goes through.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use bastion_types::{ConfigError, GatewayConfig, HeaderNames, ProxyError};
use std::sync::Arc;
use uuid::Uuid;

use super::common::circuit_breaker::CircuitBreakerManager;
use super::common::header_constants::API_KEY_QUERY_PARAM;
use super::connector::http::build_http_client;
use super::connector::Connectors;
use super::registry::{ApiRegistry, DeployedApi};
use super::retry::{RetryContext, RetryCoordinator};
use crate::error::AppResult;

/// Parsed header names from [`HeaderNames`].
#[derive(Debug, Clone)]
pub struct GatewayHeaders {
    pub transaction_id: HeaderName,
    pub request_id: HeaderName,
    pub api_key: HeaderName,
}

impl GatewayHeaders {
    pub fn parse(names: &HeaderNames) -> Result<Self, ConfigError> {
        let parse = |field: &str, value: &str| {
            HeaderName::try_from(value).map_err(|e| ConfigError::invalid(field, e.to_string()))
        };
        Ok(Self {
            transaction_id: parse("headers.transaction_id", &names.transaction_id)?,
            request_id: parse("headers.request_id", &names.request_id)?,
            api_key: parse("headers.api_key", &names.api_key)?,
        })
    }
}

/// Ids attached to every attempt of a request and echoed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayIds {
    pub transaction_id: String,
    pub request_id: String,
}

impl GatewayIds {
    /// Reuse the caller's ids when present. A missing transaction id falls
    /// back to the request id.
    pub fn from_headers(headers: &HeaderMap, names: &GatewayHeaders) -> Self {
        let read = |name: &HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let request_id = read(&names.request_id).unwrap_or_else(|| Uuid::new_v4().to_string());
        let transaction_id = read(&names.transaction_id).unwrap_or_else(|| request_id.clone());
        Self { transaction_id, request_id }
    }

    /// Set both ids on `headers`, replacing any previous value.
    pub fn apply(&self, headers: &mut HeaderMap, names: &GatewayHeaders) {
        if let Ok(value) = HeaderValue::from_str(&self.transaction_id) {
            headers.insert(names.transaction_id.clone(), value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.request_id) {
            headers.insert(names.request_id.clone(), value);
        }
    }
}

/// A request matched to its deployed API.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub api: Arc<DeployedApi>,
    /// Path left after the API context path
    pub path: String,
    pub subscription: Option<String>,
}

impl ResolvedRequest {
    pub fn retry_context(&self, ids: &GatewayIds) -> RetryContext {
        RetryContext {
            api_id: self.api.id().to_string(),
            subscription: self.subscription.clone(),
            failover: self.api.definition.failover,
            trace_id: ids.transaction_id.clone(),
        }
    }
}

pub struct Gateway {
    registry: Arc<ApiRegistry>,
    coordinator: RetryCoordinator,
    connectors: Connectors,
    headers: GatewayHeaders,
    max_body_bytes: usize,
}

impl Gateway {
    pub fn new(
        config: &GatewayConfig,
        registry: Arc<ApiRegistry>,
        coordinator: RetryCoordinator,
        connectors: Connectors,
    ) -> AppResult<Self> {
        Ok(Self {
            registry,
            coordinator,
            connectors,
            headers: GatewayHeaders::parse(&config.headers)?,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Wire a gateway with reqwest connectors and a fresh breaker store.
    /// APIs are not deployed; use [`Gateway::registry`].
    pub fn from_config(config: &GatewayConfig) -> AppResult<Self> {
        let breaker = Arc::new(CircuitBreakerManager::new(config.breaker_cache));
        let registry = Arc::new(ApiRegistry::new(Arc::clone(&breaker)));
        let client = build_http_client(config.connect_timeout())?;
        Self::new(config, registry, RetryCoordinator::new(breaker), Connectors::new(client))
    }

    pub fn registry(&self) -> &Arc<ApiRegistry> {
        &self.registry
    }

    pub fn coordinator(&self) -> &RetryCoordinator {
        &self.coordinator
    }

    pub fn breaker(&self) -> &Arc<CircuitBreakerManager> {
        self.coordinator.breaker()
    }

    pub fn connectors(&self) -> &Connectors {
        &self.connectors
    }

    pub fn headers(&self) -> &GatewayHeaders {
        &self.headers
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub fn ids(&self, headers: &HeaderMap) -> GatewayIds {
        GatewayIds::from_headers(headers, &self.headers)
    }

    /// Match the request path to a deployed API and identify the caller.
    pub fn resolve(
        &self,
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
    ) -> Result<ResolvedRequest, ProxyError> {
        let (api, rest) = self
            .registry
            .resolve(path)
            .ok_or_else(|| ProxyError::ApiNotFound { path: path.to_string() })?;

        let subscription = self
            .api_key(query, headers)
            .and_then(|key| api.definition.subscription_for(&key).map(str::to_string));

        Ok(ResolvedRequest { api, path: rest, subscription })
    }

    fn api_key(&self, query: Option<&str>, headers: &HeaderMap) -> Option<String> {
        if let Some(key) = headers.get(&self.headers.api_key).and_then(|v| v.to_str().ok()) {
            return Some(key.to_string());
        }
        query_param(query, API_KEY_QUERY_PARAM)
    }
}

/// First value of `name` in a raw query string, percent-decoded.
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

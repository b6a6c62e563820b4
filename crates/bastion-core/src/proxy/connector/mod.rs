//! Backend connectors.
//!
//! A request/response connector performs one HTTP exchange per attempt; a
//! message connector opens a stream of messages whose connect phase is the
//! only part subject to failover.

pub mod http;
pub mod mock;
pub mod sse;


use async_trait::async_trait;
use axum::http::{HeaderMap, Method, StatusCode};
use bastion_types::ConnectorKind;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::endpoint::Endpoint;
use super::retry::replay::ReplayBody;

pub use http::ReqwestConnector;
pub use mock::MockConnector;
pub use sse::SseConnector;

/// Failure reported by a connector for a single attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectorError {
    /// The backend could not be reached (DNS, TCP refusal, TLS, connect timeout)
    #[error("connect failure: {0}")]
    Connect(String),
    /// The backend was reached but the exchange failed
    #[error("call failure: {0}")]
    Call(String),
}

/// Request forwarded on every attempt.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub method: Method,
    /// Path appended to the endpoint target path
    pub path: String,
    /// Inbound query string, merged after the target's own query
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: ReplayBody,
}

pub enum ResponseBody {
    Full(Bytes),
    Stream(BoxStream<'static, Result<Bytes, ConnectorError>>),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

#[derive(Debug)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

#[async_trait]
pub trait HttpConnector: Send + Sync {
    /// Perform one exchange. Completes once the response head is received.
    async fn send(
        &self,
        endpoint: &Endpoint,
        request: &BackendRequest,
    ) -> Result<BackendResponse, ConnectorError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: Option<String>,
    pub content: String,
}

pub type MessageStream = BoxStream<'static, Result<Message, ConnectorError>>;

#[async_trait]
pub trait MessageConnector: Send + Sync {
    /// Open the message source. Only failures returned here are retried.
    async fn connect(
        &self,
        endpoint: &Endpoint,
        headers: &HeaderMap,
    ) -> Result<MessageStream, ConnectorError>;
}

/// Connector set used by the gateway, one per connector kind.
#[derive(Clone)]
pub struct Connectors {
    pub http: Arc<dyn HttpConnector>,
    pub sse: Arc<dyn MessageConnector>,
    pub mock: Arc<dyn MessageConnector>,
}

impl Connectors {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            http: Arc::new(ReqwestConnector::new(client.clone())),
            sse: Arc::new(SseConnector::new(client)),
            mock: Arc::new(MockConnector),
        }
    }

    pub fn message(&self, kind: ConnectorKind) -> Option<Arc<dyn MessageConnector>> {
        match kind {
            ConnectorKind::Sse => Some(Arc::clone(&self.sse)),
            ConnectorKind::Mock => Some(Arc::clone(&self.mock)),
            ConnectorKind::HttpProxy => None,
        }
    }
}

//! Server-Sent Events message source.

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue};
use eventsource_stream::Eventsource;
use futures::StreamExt;

use super::http::classify_error;
use super::{ConnectorError, Message, MessageConnector, MessageStream};
use crate::proxy::endpoint::Endpoint;

#[derive(Debug, Clone)]
pub struct SseConnector {
    client: reqwest::Client,
}

impl SseConnector {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageConnector for SseConnector {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        headers: &HeaderMap,
    ) -> Result<MessageStream, ConnectorError> {
        let mut headers = headers.clone();
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/event-stream"));

        let response = self
            .client
            .get(endpoint.target.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| classify_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectorError::Connect(format!("message source answered {status}")));
        }

        let stream = response.bytes_stream().eventsource().map(|event| match event {
            Ok(event) => Ok(Message {
                id: Some(event.id).filter(|id| !id.is_empty()),
                content: event.data,
            }),
            Err(e) => Err(ConnectorError::Call(e.to_string())),
        });
        Ok(stream.boxed())
    }
}

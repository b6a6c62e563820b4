//! Built-in generated message source.

use async_trait::async_trait;
use axum::http::HeaderMap;
use futures::StreamExt;
use std::time::Duration;

use super::{ConnectorError, Message, MessageConnector, MessageStream};
use crate::proxy::endpoint::Endpoint;

/// Emits `message_count` messages (or an endless stream), one every
/// `message_interval_ms`, the first one immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockConnector;

#[async_trait]
impl MessageConnector for MockConnector {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        _headers: &HeaderMap,
    ) -> Result<MessageStream, ConnectorError> {
        let config = endpoint.mock.clone().unwrap_or_default();
        let interval = Duration::from_millis(config.message_interval_ms);

        let stream = async_stream::stream! {
            let mut id: u64 = 0;
            loop {
                if config.message_count.is_some_and(|count| id >= u64::from(count)) {
                    break;
                }
                if id > 0 {
                    tokio::time::sleep(interval).await;
                }
                yield Ok::<Message, ConnectorError>(Message {
                    id: Some(id.to_string()),
                    content: config.message_content.clone(),
                });
                id += 1;
            }
        };
        Ok(stream.boxed())
    }
}

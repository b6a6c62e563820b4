//! HTTP GET entrypoint of message APIs.
//!
//! The caller receives a `text/plain` listing of the messages read from the
//! message source:
//!
//! ```text
//! items
//! item
//! id: 0
//! content: mock message
//!
//! item
//! id: 1
//! content: mock message
//!
//! pagination
//! nextCursor: 1
//! ```
//!
//! Only the connection to the source goes through the retry coordinator; once
//! messages flow, a source error ends the listing with an `error` block.

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::Response;
use bastion_types::MessageEntrypointConfig;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use super::proxy::forwarded_headers;
use crate::proxy::common::header_constants::LIMIT_QUERY_PARAM;
use crate::proxy::connector::{ConnectorError, Message, MessageStream};
use crate::proxy::gateway::{query_param, Gateway, GatewayIds, ResolvedRequest};
use crate::proxy::response::{error_response, status_response};
use crate::proxy::routing::RouteRequest;

/// Bounds of one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLimits {
    pub count: u32,
    pub duration: Option<Duration>,
    /// Raw `limit` query parameter, echoed in the pagination block
    pub limit_param: Option<String>,
}

impl ListingLimits {
    /// The `limit` query parameter can only lower the configured count.
    pub fn new(config: &MessageEntrypointConfig, query: Option<&str>) -> Self {
        let limit_param = query_param(query, LIMIT_QUERY_PARAM).filter(|l| !l.is_empty());
        let count = limit_param
            .as_deref()
            .and_then(|l| l.parse::<u32>().ok())
            .map_or(config.limit_count, |requested| requested.min(config.limit_count));
        let duration = (config.limit_duration_ms > 0)
            .then(|| Duration::from_millis(config.limit_duration_ms));
        Self { count, duration, limit_param }
    }
}

fn item_block(kind: &str, id: Option<&str>, content: &str, first: bool) -> String {
    let mut block = String::new();
    if !first {
        block.push('\n');
    }
    block.push_str(kind);
    block.push('\n');
    if let Some(id) = id {
        let _ = writeln!(block, "id: {id}");
    }
    let _ = writeln!(block, "content: {content}");
    block
}

fn pagination_block(next_cursor: &str, limit_param: Option<&str>) -> String {
    let mut block = format!("\npagination\nnextCursor: {next_cursor}");
    if let Some(limit) = limit_param {
        let _ = write!(block, "\nlimit: {limit}");
    }
    block
}

/// Render `messages` as the plain text listing, stopping at the count or
/// duration bound, whichever comes first.
pub fn render_listing(
    messages: MessageStream,
    limits: ListingLimits,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        yield Ok::<Bytes, Infallible>(Bytes::from_static(b"items\n"));

        let deadline = limits.duration.map(|d| tokio::time::Instant::now() + d);
        let mut messages = messages.take(limits.count as usize);
        let mut first = true;
        let mut last_id: Option<String> = None;
        let mut failure: Option<ConnectorError> = None;

        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, messages.next()).await {
                    Ok(next) => next,
                    Err(_) => break,
                },
                None => messages.next().await,
            };
            match next {
                Some(Ok(Message { id, content })) => {
                    yield Ok(Bytes::from(item_block("item", id.as_deref(), &content, first)));
                    first = false;
                    if id.is_some() {
                        last_id = id;
                    }
                },
                Some(Err(error)) => {
                    failure = Some(error);
                    break;
                },
                None => break,
            }
        }

        if let Some(error) = failure {
            yield Ok(Bytes::from(item_block("error", None, &error.to_string(), false)));
        }
        if let Some(cursor) = last_id.filter(|id| !id.is_empty()) {
            yield Ok(Bytes::from(pagination_block(&cursor, limits.limit_param.as_deref())));
        }
    }
}

pub async fn subscribe(
    gateway: &Gateway,
    resolved: ResolvedRequest,
    ids: GatewayIds,
    request: Request,
) -> Response {
    let names = gateway.headers();
    if request.method() != Method::GET {
        return status_response(StatusCode::METHOD_NOT_ALLOWED, &ids, names);
    }

    let api = &resolved.api;
    let decision = api.router().route(&RouteRequest {
        method: request.method(),
        path: &resolved.path,
        headers: request.headers(),
    });
    let target = match api.target(&decision) {
        Ok(target) => target,
        Err(error) => return error_response(&error, &ids, names),
    };

    let mut headers = forwarded_headers(request.headers());
    ids.apply(&mut headers, names);
    let headers = Arc::new(headers);
    let limits = ListingLimits::new(&api.definition.message, request.uri().query());

    let ctx = resolved.retry_context(&ids);
    let connectors = gateway.connectors().clone();
    let result = gateway
        .coordinator()
        .execute(&ctx, &target, move |endpoint| {
            let connector = connectors.message(endpoint.connector);
            let headers = Arc::clone(&headers);
            async move {
                match connector {
                    Some(connector) => connector.connect(&endpoint, &headers).await,
                    None => Err(ConnectorError::Call(format!(
                        "endpoint {} has no message connector",
                        endpoint.name
                    ))),
                }
            }
        })
        .await;

    let messages = match result {
        Ok(delivered) => delivered.value,
        Err(error) => return error_response(&error, &ids, names),
    };

    let mut response = Response::new(Body::from_stream(render_listing(messages, limits)));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    ids.apply(response.headers_mut(), names);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn message(id: &str, content: &str) -> Result<Message, ConnectorError> {
        Ok(Message { id: Some(id.to_string()), content: content.to_string() })
    }

    async fn render(messages: Vec<Result<Message, ConnectorError>>, limits: ListingLimits) -> String {
        let chunks: Vec<_> = render_listing(stream::iter(messages).boxed(), limits).collect().await;
        chunks
            .into_iter()
            .map(|chunk| match chunk {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(never) => match never {},
            })
            .collect()
    }

    fn limits(count: u32) -> ListingLimits {
        ListingLimits { count, duration: None, limit_param: None }
    }

    #[test]
    fn test_limit_param_only_lowers_count() {
        let config = MessageEntrypointConfig { limit_count: 10, limit_duration_ms: 0 };
        assert_eq!(ListingLimits::new(&config, Some("limit=3")).count, 3);
        assert_eq!(ListingLimits::new(&config, Some("limit=50")).count, 10);
        assert_eq!(ListingLimits::new(&config, None).count, 10);
        assert!(ListingLimits::new(&config, None).duration.is_none());
    }

    #[tokio::test]
    async fn test_listing_format_with_pagination() {
        let mut bounds = limits(2);
        bounds.limit_param = Some("2".to_string());
        let body = render(vec![message("0", "a"), message("1", "b"), message("2", "c")], bounds).await;

        assert_eq!(
            body,
            "items\nitem\nid: 0\ncontent: a\n\nitem\nid: 1\ncontent: b\n\npagination\nnextCursor: 1\nlimit: 2"
        );
    }

    #[tokio::test]
    async fn test_listing_ends_with_error_block() {
        let body = render(
            vec![message("0", "a"), Err(ConnectorError::Call("source gone".to_string()))],
            limits(10),
        )
        .await;

        assert!(body.starts_with("items\nitem\nid: 0\ncontent: a\n"));
        assert!(body.contains("\nerror\ncontent: call failure: source gone\n"));
        assert!(body.ends_with("\npagination\nnextCursor: 0"));
    }

    #[tokio::test]
    async fn test_empty_listing_has_no_pagination() {
        assert_eq!(render(vec![], limits(10)).await, "items\n");
    }
}

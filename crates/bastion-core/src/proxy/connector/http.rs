use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use url::Url;

use super::{BackendRequest, BackendResponse, ConnectorError, HttpConnector, ResponseBody};
use crate::error::AppResult;
use crate::proxy::endpoint::Endpoint;

/// Build the shared HTTP client used by every connector.
///
/// No overall timeout is set: slow calls are detected by the retry
/// coordinator. Redirects are returned to the caller, not followed.
pub fn build_http_client(connect_timeout: Duration) -> AppResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .tcp_nodelay(true)
        .build()?;
    Ok(client)
}

/// Endpoint URL for one attempt: the remaining request path is appended to the
/// target path and the inbound query follows the target's own parameters.
pub fn target_url(target: &Url, path: &str, query: Option<&str>) -> Url {
    let mut url = target.clone();
    if !path.is_empty() {
        let base = target.path().trim_end_matches('/');
        url.set_path(&format!("{base}/{}", path.trim_start_matches('/')));
    }

    let inbound = query.filter(|q| !q.is_empty());
    let merged = match (target.query().filter(|q| !q.is_empty()), inbound) {
        (Some(own), Some(inbound)) => Some(format!("{own}&{inbound}")),
        (Some(own), None) => Some(own.to_string()),
        (None, inbound) => inbound.map(str::to_string),
    };
    url.set_query(merged.as_deref());
    url
}

pub(crate) fn classify_error(error: &reqwest::Error) -> ConnectorError {
    if error.is_connect() {
        ConnectorError::Connect(error.to_string())
    } else {
        ConnectorError::Call(error.to_string())
    }
}

/// Request/response connector backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestConnector {
    client: reqwest::Client,
}

impl ReqwestConnector {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpConnector for ReqwestConnector {
    async fn send(
        &self,
        endpoint: &Endpoint,
        request: &BackendRequest,
    ) -> Result<BackendResponse, ConnectorError> {
        let url = target_url(&endpoint.target, &request.path, request.query.as_deref());
        tracing::debug!(endpoint = %endpoint.name, url = %url, method = %request.method, "Sending attempt");

        let mut builder =
            self.client.request(request.method.clone(), url).headers(request.headers.clone());
        if !request.body.is_empty() {
            builder = builder.body(request.body.replay());
        }

        let response = builder.send().await.map_err(|e| classify_error(&e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ConnectorError::Call(e.to_string())))
            .boxed();

        Ok(BackendResponse { status, headers, body: ResponseBody::Stream(body) })
    }
}

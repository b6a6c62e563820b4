use axum::{extract::DefaultBodyLimit, Router};
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::proxy::gateway::Gateway;
use crate::proxy::handlers;

/// Axum application state of the gateway entrypoint
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

/// Router serving every deployed API.
///
/// All paths fall through to the gateway, so it is meant to be merged below
/// any explicit routes. The body limit is enforced per request by the
/// gateway, not by axum.
pub fn build_proxy_router(gateway: Arc<Gateway>) -> Router<()> {
    let state = AppState { gateway };

    Router::new()
        .fallback(handlers::handle_request)
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Configuration for starting the Axum server
pub struct ServerStartConfig {
    pub host: String,
    pub port: u16,
    pub gateway: Arc<Gateway>,
}

/// Axum server instance
pub struct AxumServer {
    config: ServerStartConfig,
    extra_routes: Option<Router<()>>,
}

impl AxumServer {
    pub fn new(config: ServerStartConfig) -> Self {
        Self { config, extra_routes: None }
    }

    /// Routes served ahead of the deployed APIs (health, ops endpoints).
    pub fn with_routes(mut self, routes: Router<()>) -> Self {
        self.extra_routes = Some(routes);
        self
    }

    pub fn router(&self) -> Router<()> {
        let proxy = build_proxy_router(Arc::clone(&self.config.gateway));
        match &self.extra_routes {
            Some(routes) => routes.clone().merge(proxy),
            None => proxy,
        }
    }

    pub async fn run<F>(self, shutdown: F) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Gateway listening on http://{}", listener.local_addr()?);

        axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
        tracing::info!("Gateway stopped");
        Ok(())
    }
}

pub mod common;
pub mod connector;
pub mod endpoint;
pub mod gateway;
pub mod handlers;
pub mod prometheus;
pub mod registry;
pub mod response;
pub mod retry;
pub mod routing;
pub mod server;

pub use common::circuit_breaker::{
    BreakerPolicy, CircuitBreakerKey, CircuitBreakerManager, CircuitBreakerSummary,
    CircuitSnapshot, CircuitState,
};
pub use connector::{Connectors, HttpConnector, MessageConnector};
pub use gateway::Gateway;
pub use registry::{ApiRegistry, DeployedApi};
pub use retry::{RetryContext, RetryCoordinator};
pub use routing::{DynamicRouter, RouteDecision, RouteRequest, RuleRouter};
pub use server::{build_proxy_router, AppState, AxumServer, ServerStartConfig};

//! Domain models for the Bastion gateway.
//!
//! All structures here are deserialized from the gateway configuration and
//! never mutated after deployment; a redeploy replaces them wholesale.

mod api;
mod endpoint;
mod failover;
mod gateway;
mod routing;

pub use api::{ApiDefinition, ApiKeySubscription, ApiKind, MessageEntrypointConfig};
pub use endpoint::{
    ConnectorKind, EndpointConfig, EndpointGroupConfig, LoadBalancerKind, MockMessageConfig,
};
pub use failover::{FailoverConfig, SlowCallMode};
pub use gateway::{BreakerCacheConfig, GatewayConfig, HeaderNames};
pub use routing::RoutingRule;

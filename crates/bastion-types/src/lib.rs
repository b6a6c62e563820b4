//! # Bastion Types
//!
//! Configuration models and error definitions for the Bastion gateway.
//!
//! - **`error`** - Typed error hierarchy for proxying and configuration
//! - **`models`** - API definitions, endpoint groups, failover policy, gateway settings
//!
//! ## Architecture Role
//!
//! `bastion-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!          bastion-types (this crate)
//!                  │
//!                  ▼
//!            bastion-core
//!                  │
//!                  ▼
//!           bastion-server
//! ```
//!
//! Everything here is plain data: serializable, `Clone`, and free of I/O.

pub mod error;
pub mod models;

pub use error::{ConfigError, ProxyError, Result, TypedError};

pub use models::{
    ApiDefinition, ApiKeySubscription, ApiKind, BreakerCacheConfig, ConnectorKind,
    EndpointConfig, EndpointGroupConfig, FailoverConfig, GatewayConfig, HeaderNames,
    LoadBalancerKind, MessageEntrypointConfig, MockMessageConfig, RoutingRule, SlowCallMode,
};

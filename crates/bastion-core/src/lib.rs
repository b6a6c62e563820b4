//! # Bastion Core
//!
//! Failover proxy engine of the Bastion gateway.
//!
//! ```text
//! bastion-core/src/proxy/
//! ├── common/circuit_breaker/  # per-(api, group, scope) breakers + bounded store
//! ├── endpoint/                # endpoints, groups, load balancers
//! ├── retry/                   # retry coordinator, attempts, body replay
//! ├── connector/               # http proxy, sse and mock message sources
//! ├── routing.rs               # dynamic routing strategy
//! ├── registry.rs              # deployed APIs
//! ├── gateway.rs               # request orchestration
//! ├── response.rs              # response assembly
//! ├── handlers/                # axum handlers (proxy, message)
//! ├── server.rs                # router + AxumServer
//! └── prometheus.rs            # metrics
//! ```

#![allow(
    clippy::significant_drop_tightening,
    reason = "DashMap guards in breaker code require careful lifetime management"
)]
#![allow(
    clippy::redundant_else,
    reason = "Explicit else blocks improve readability in complex control flow"
)]
#![allow(clippy::map_err_ignore, reason = "Error context is provided in the replacement message")]
#![cfg_attr(
    test,
    allow(clippy::panic, clippy::float_cmp, clippy::assertions_on_result_states)
)]

pub mod error;
pub mod modules;
pub mod proxy;

pub use error::{AppError, AppResult};

//! Endpoints and load-balanced endpoint groups.
//!
//! Both are built once per deployment and never mutated; a redeploy builds
//! new instances. The only shared mutable state is the balancer cursor.

pub mod load_balancer;

#[cfg(test)]
mod tests;

use bastion_types::{
    ConfigError, ConnectorKind, EndpointConfig, EndpointGroupConfig, LoadBalancerKind,
    MockMessageConfig,
};
use std::sync::Arc;
use url::Url;

use load_balancer::LoadBalancer;

/// A single backend target.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub name: String,
    /// Name of the owning group (breaker keys are per group)
    pub group: String,
    pub target: Url,
    pub weight: u32,
    pub connector: ConnectorKind,
    pub mock: Option<MockMessageConfig>,
}

impl Endpoint {
    pub fn from_config(group: &str, config: &EndpointConfig) -> Result<Self, ConfigError> {
        let target = Url::parse(&config.target).map_err(|e| {
            ConfigError::invalid(format!("{}.target", config.name), e.to_string())
        })?;
        Ok(Self {
            name: config.name.clone(),
            group: group.to_string(),
            target,
            weight: config.weight,
            connector: config.connector,
            mock: config.mock.clone(),
        })
    }
}

#[derive(Debug)]
pub struct EndpointGroup {
    name: String,
    kind: LoadBalancerKind,
    endpoints: Vec<Arc<Endpoint>>,
    balancer: Box<dyn LoadBalancer>,
}

impl EndpointGroup {
    pub fn new(name: impl Into<String>, kind: LoadBalancerKind, endpoints: Vec<Arc<Endpoint>>) -> Self {
        let weights: Vec<u32> = endpoints.iter().map(|e| e.weight).collect();
        Self { name: name.into(), kind, balancer: load_balancer::build(kind, &weights), endpoints }
    }

    pub fn from_config(config: &EndpointGroupConfig) -> Result<Self, ConfigError> {
        let endpoints = config
            .endpoints
            .iter()
            .map(|e| Endpoint::from_config(&config.name, e).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        if endpoints.is_empty() {
            return Err(ConfigError::invalid(
                format!("{}.endpoints", config.name),
                "group has no endpoint",
            ));
        }
        Ok(Self::new(config.name.clone(), config.load_balancer, endpoints))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn load_balancer(&self) -> LoadBalancerKind {
        self.kind
    }

    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<Arc<Endpoint>> {
        self.endpoints.iter().find(|e| e.name == name).cloned()
    }

    /// Next endpoint according to the group's load-balancing strategy.
    /// Failed members are not skipped.
    pub fn next(&self) -> Option<Arc<Endpoint>> {
        if self.endpoints.is_empty() {
            return None;
        }
        self.endpoints.get(self.balancer.next_index()).cloned()
    }

    /// Next endpoint whose name is not in `tried`. Once every member has been
    /// tried, falls back to plain [`Self::next`].
    pub fn next_excluding(&self, tried: &[String]) -> Option<Arc<Endpoint>> {
        if tried.is_empty() {
            return self.next();
        }
        let untried = |e: &Arc<Endpoint>| !tried.iter().any(|t| *t == e.name);
        if !self.endpoints.iter().any(untried) {
            return self.next();
        }
        for _ in 0..self.endpoints.len() {
            if let Some(candidate) = self.next() {
                if untried(&candidate) {
                    return Some(candidate);
                }
            }
        }
        // Random balancers can keep drawing tried members
        self.endpoints.iter().find(|&e| untried(e)).cloned()
    }
}

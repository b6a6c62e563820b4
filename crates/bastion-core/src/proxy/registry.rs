//! Deployed APIs.
//!
//! Deploying builds immutable endpoint groups and a router from an
//! [`ApiDefinition`]; redeploying replaces the whole API and drops the
//! breaker state of the previous deployment.

use bastion_types::{ApiDefinition, ProxyError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::common::circuit_breaker::CircuitBreakerManager;
use super::endpoint::{Endpoint, EndpointGroup};
use super::retry::AttemptTarget;
use super::routing::{DynamicRouter, RouteDecision, RuleRouter};
use crate::error::{AppError, AppResult};

#[derive(Debug)]
pub struct DeployedApi {
    pub definition: ApiDefinition,
    groups: Vec<Arc<EndpointGroup>>,
    router: Arc<dyn DynamicRouter>,
}

impl DeployedApi {
    pub fn build(definition: ApiDefinition) -> AppResult<Self> {
        definition.validate_definition()?;
        let groups = definition
            .endpoint_groups
            .iter()
            .map(|g| EndpointGroup::from_config(g).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        let group_names: Vec<&str> = groups.iter().map(|g| g.name()).collect();
        let endpoint_names: Vec<&str> =
            groups.iter().flat_map(|g| g.endpoints().iter().map(|e| e.name.as_str())).collect();
        let router = RuleRouter::compile(&definition.routing, &group_names, &endpoint_names)?;

        Ok(Self { definition, groups, router: Arc::new(router) })
    }

    /// Replace the configured router, e.g. with a custom strategy.
    pub fn with_router(mut self, router: Arc<dyn DynamicRouter>) -> Self {
        self.router = router;
        self
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn router(&self) -> &Arc<dyn DynamicRouter> {
        &self.router
    }

    pub fn groups(&self) -> &[Arc<EndpointGroup>] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<Arc<EndpointGroup>> {
        self.groups.iter().find(|g| g.name() == name).cloned()
    }

    pub fn endpoint(&self, name: &str) -> Option<Arc<Endpoint>> {
        self.groups.iter().find_map(|g| g.find(name))
    }

    /// Turn a routing decision into the target of the retry coordinator.
    pub fn target(&self, decision: &RouteDecision) -> Result<AttemptTarget, ProxyError> {
        match decision {
            RouteDecision::Default => self
                .groups
                .first()
                .cloned()
                .map(AttemptTarget::Group)
                .ok_or_else(|| ProxyError::NoEndpoint { group: "default".to_string() }),
            RouteDecision::Group { name, .. } => self
                .group(name)
                .map(AttemptTarget::Group)
                .ok_or_else(|| ProxyError::UnknownTarget { name: name.clone() }),
            RouteDecision::Endpoint { name, .. } => self
                .endpoint(name)
                .map(AttemptTarget::Endpoint)
                .ok_or_else(|| ProxyError::UnknownTarget { name: name.clone() }),
        }
    }

    /// Whether `path` falls under this API's context path.
    /// Returns the remaining path on match.
    pub fn strip_context_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        let context = normalize_context_path(&self.definition.context_path);
        if context == "/" {
            return Some(path);
        }
        let rest = path.strip_prefix(context)?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

fn normalize_context_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

#[derive(Debug)]
pub struct ApiRegistry {
    apis: RwLock<HashMap<String, Arc<DeployedApi>>>,
    breaker: Arc<CircuitBreakerManager>,
}

impl ApiRegistry {
    pub fn new(breaker: Arc<CircuitBreakerManager>) -> Self {
        Self { apis: RwLock::new(HashMap::new()), breaker }
    }

    pub fn deploy(&self, definition: ApiDefinition) -> AppResult<Arc<DeployedApi>> {
        self.deploy_api(DeployedApi::build(definition)?)
    }

    /// Register an already built API, replacing any deployment with the same id.
    pub fn deploy_api(&self, api: DeployedApi) -> AppResult<Arc<DeployedApi>> {
        let api = Arc::new(api);
        let mut apis = self.apis.write();

        let context = normalize_context_path(&api.definition.context_path);
        if let Some(clash) = apis.values().find(|other| {
            other.id() != api.id() && normalize_context_path(&other.definition.context_path) == context
        }) {
            return Err(AppError::Deploy(format!(
                "context path {} already used by API {}",
                context,
                clash.id()
            )));
        }

        let replaced = apis.insert(api.id().to_string(), Arc::clone(&api)).is_some();
        drop(apis);

        if replaced {
            self.breaker.forget_api(api.id());
        }
        info!(
            api_id = %api.id(),
            context_path = %api.definition.context_path,
            groups = api.groups.len(),
            redeploy = replaced,
            "API deployed"
        );
        Ok(api)
    }

    pub fn undeploy(&self, api_id: &str) -> bool {
        let removed = self.apis.write().remove(api_id).is_some();
        if removed {
            self.breaker.forget_api(api_id);
            info!(api_id = %api_id, "API undeployed");
        }
        removed
    }

    /// Replace every deployment at once. Nothing changes if any definition is invalid.
    pub fn replace_all(&self, definitions: Vec<ApiDefinition>) -> AppResult<usize> {
        let built = definitions.into_iter().map(DeployedApi::build).collect::<AppResult<Vec<_>>>()?;

        let mut next = HashMap::with_capacity(built.len());
        let mut contexts = HashMap::with_capacity(built.len());
        for api in built {
            let id = api.id().to_string();
            let context = normalize_context_path(&api.definition.context_path).to_string();
            if let Some(other) = contexts.insert(context.clone(), id.clone()) {
                return Err(AppError::Deploy(format!(
                    "context path {context} used by both {other} and {id}"
                )));
            }
            if next.insert(id.clone(), Arc::new(api)).is_some() {
                return Err(AppError::Deploy(format!("duplicate API id {id}")));
            }
        }
        let count = next.len();

        let previous = std::mem::replace(&mut *self.apis.write(), next);
        for api_id in previous.keys() {
            self.breaker.forget_api(api_id);
        }
        info!(apis = count, "Deployments replaced");
        Ok(count)
    }

    /// API whose context path is the longest prefix of `path`, with the remaining path.
    pub fn resolve(&self, path: &str) -> Option<(Arc<DeployedApi>, String)> {
        let apis = self.apis.read();
        apis.values()
            .filter_map(|api| api.strip_context_path(path).map(|rest| (api, rest)))
            .max_by_key(|(api, _)| normalize_context_path(&api.definition.context_path).len())
            .map(|(api, rest)| (Arc::clone(api), rest.to_string()))
    }

    pub fn get(&self, api_id: &str) -> Option<Arc<DeployedApi>> {
        self.apis.read().get(api_id).cloned()
    }

    pub fn list(&self) -> Vec<Arc<DeployedApi>> {
        let mut apis: Vec<_> = self.apis.read().values().cloned().collect();
        apis.sort_by(|a, b| a.id().cmp(b.id()));
        apis
    }

    pub fn len(&self) -> usize {
        self.apis.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.apis.read().is_empty()
    }
}

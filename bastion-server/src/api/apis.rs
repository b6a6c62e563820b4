use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use bastion_core::proxy::DeployedApi;
use bastion_types::{ApiKind, FailoverConfig, LoadBalancerKind};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub load_balancer: LoadBalancerKind,
    pub endpoints: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiSummary {
    pub id: String,
    pub name: String,
    pub context_path: String,
    pub kind: ApiKind,
    pub groups: Vec<GroupSummary>,
    pub endpoint_count: usize,
    pub routing_rules: usize,
    pub subscriptions: usize,
    pub failover: FailoverConfig,
}

impl From<&DeployedApi> for ApiSummary {
    fn from(api: &DeployedApi) -> Self {
        let definition = &api.definition;
        Self {
            id: definition.id.clone(),
            name: definition.name.clone(),
            context_path: definition.context_path.clone(),
            kind: definition.kind,
            groups: api
                .groups()
                .iter()
                .map(|group| GroupSummary {
                    name: group.name().to_string(),
                    load_balancer: group.load_balancer(),
                    endpoints: group.endpoints().iter().map(|e| e.name.clone()).collect(),
                })
                .collect(),
            endpoint_count: definition.endpoint_count(),
            routing_rules: definition.routing.len(),
            subscriptions: definition.subscriptions.len(),
            failover: definition.failover,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiListResponse {
    pub count: usize,
    pub apis: Vec<ApiSummary>,
}

pub async fn list_apis(State(state): State<AppState>) -> Json<ApiListResponse> {
    let apis: Vec<ApiSummary> =
        state.registry().list().iter().map(|api| ApiSummary::from(api.as_ref())).collect();
    Json(ApiListResponse { count: apis.len(), apis })
}

pub async fn get_api(
    State(state): State<AppState>,
    Path(api_id): Path<String>,
) -> Result<Json<ApiSummary>, StatusCode> {
    state
        .registry()
        .get(&api_id)
        .map(|api| Json(ApiSummary::from(api.as_ref())))
        .ok_or(StatusCode::NOT_FOUND)
}

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;

use super::apis::{get_api, list_apis};
use crate::test_helpers::{api_json, test_app_state, write_config};

#[tokio::test]
async fn test_list_apis_sorted_by_id() {
    let (state, _tmp) = test_app_state();
    let Json(response) = list_apis(State(state)).await;
    assert_eq!(response.count, 2);
    assert_eq!(response.apis[0].id, "orders");
    assert_eq!(response.apis[1].id, "users");
    assert_eq!(response.apis[0].groups[0].endpoints, vec!["endpoint-1"]);
    assert!(response.apis[0].failover.enabled);
}

#[tokio::test]
async fn test_get_unknown_api_is_not_found() {
    let (state, _tmp) = test_app_state();
    let result = get_api(State(state), Path("missing".to_string())).await;
    assert!(matches!(result, Err(StatusCode::NOT_FOUND)));
}

#[tokio::test]
async fn test_reload_replaces_deployments() {
    let (state, tmp) = test_app_state();
    write_config(&tmp, &[api_json("billing", "/billing")]);

    assert_eq!(state.reload().expect("reload succeeds"), 1);

    let Json(response) = list_apis(State(state.clone())).await;
    let ids: Vec<_> = response.apis.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["billing"]);
    assert!(get_api(State(state), Path("billing".to_string())).await.is_ok());
}

#[tokio::test]
async fn test_failed_reload_keeps_deployments() {
    let (state, tmp) = test_app_state();
    std::fs::write(tmp.path().join("gateway.json"), "{ broken").expect("write");

    assert!(state.reload().is_err());
    assert_eq!(state.registry().len(), 2);
}

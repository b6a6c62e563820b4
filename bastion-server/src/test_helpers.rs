//! Test helpers for bastion-server unit tests.

use std::sync::Arc;

use tempfile::TempDir;

use bastion_core::modules::config::load_config;
use bastion_core::proxy::Gateway;

use crate::state::AppState;

pub fn api_json(id: &str, context_path: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": format!("{id} api"),
        "contextPath": context_path,
        "endpointGroups": [{ "name": "default-group", "endpoints": [
            { "name": "endpoint-1", "target": "http://127.0.0.1:9/endpoint" }
        ]}],
        "failover": { "enabled": true, "maxRetries": 2, "slowCallDuration": 500, "maxFailures": 5 }
    })
}

/// Write a gateway config holding `apis` into `dir`, returning its path.
pub fn write_config(dir: &TempDir, apis: &[serde_json::Value]) -> std::path::PathBuf {
    let path = dir.path().join("gateway.json");
    let config = serde_json::json!({ "port": 8082, "apis": apis });
    std::fs::write(&path, config.to_string()).expect("failed to write config");
    path
}

/// Create an `AppState` with two deployed APIs (`orders`, `users`).
///
/// Returns `(AppState, TempDir)`; keep `TempDir` alive for the test duration.
pub fn test_app_state() -> (AppState, TempDir) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let path = write_config(&temp_dir, &[api_json("orders", "/orders"), api_json("users", "/users")]);

    let config = load_config(&path).expect("failed to load test config");
    let gateway = Gateway::from_config(&config).expect("failed to build gateway");
    gateway.registry().replace_all(config.apis).expect("failed to deploy test apis");

    (AppState::new(Arc::new(gateway), path), temp_dir)
}

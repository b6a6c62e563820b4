//! Gateway configuration loading.
//!
//! The main file is a JSON [`GatewayConfig`]. When it names an `apis_dir`,
//! every `*.json` file of that directory holds one more [`ApiDefinition`];
//! a relative `apis_dir` is resolved against the config file's directory.

use bastion_types::{ApiDefinition, ConfigError, GatewayConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_DIR: &str = "bastion";
const CONFIG_FILE: &str = "gateway.json";

/// `<config dir>/bastion/gateway.json`, e.g. `~/.config/bastion/gateway.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound { path: path.display().to_string() }
        } else {
            ConfigError::from_io_error(&e)
        }
    })?;
    serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
        message: format!("{}: {}", path.display(), e),
    })
}

/// Load and validate the configuration, merging in the APIs of `apis_dir`.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let mut config: GatewayConfig = read_json(path)?;

    if let Some(dir) = config.apis_dir.clone() {
        let dir = if dir.is_relative() {
            path.parent().map_or(dir.clone(), |base| base.join(&dir))
        } else {
            dir
        };
        let extra = load_api_dir(&dir)?;
        debug!(dir = %dir.display(), apis = extra.len(), "Loaded API directory");
        config.apis.extend(extra);
    }

    config.validate_all()?;
    info!(path = %path.display(), apis = config.apis.len(), "Configuration loaded");
    Ok(config)
}

/// Every `*.json` file of `dir`, in file name order.
pub fn load_api_dir(dir: &Path) -> Result<Vec<ApiDefinition>, ConfigError> {
    let entries = fs::read_dir(dir).map_err(|e| ConfigError::ReadError {
        message: format!("{}: {}", dir.display(), e),
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    files.iter().map(|file| read_json(file)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn api_json(id: &str, context_path: &str) -> String {
        serde_json::json!({
            "id": id,
            "contextPath": context_path,
            "endpointGroups": [{ "name": "default-group", "endpoints": [
                { "name": "endpoint-1", "target": "http://localhost:8080/endpoint-1" }
            ]}],
            "failover": { "enabled": true, "maxRetries": 2, "slowCallDuration": 500 }
        })
        .to_string()
    }

    #[test]
    fn test_load_config_merges_api_dir() {
        let tmp = TempDir::new().expect("tempdir");
        fs::create_dir(tmp.path().join("apis")).expect("mkdir");
        fs::write(tmp.path().join("apis/b.json"), api_json("b", "/b")).expect("write");
        fs::write(tmp.path().join("apis/notes.txt"), "ignored").expect("write");
        let config_path = tmp.path().join("gateway.json");
        fs::write(
            &config_path,
            format!(r#"{{ "port": 9000, "apis_dir": "apis", "apis": [{}] }}"#, api_json("a", "/a")),
        )
        .expect("write");

        let config = load_config(&config_path).expect("loads");
        assert_eq!(config.port, 9000);
        let ids: Vec<_> = config.apis.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(config.apis[0].failover.slow_call_duration_ms, 500);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let tmp = TempDir::new().expect("tempdir");
        assert!(matches!(
            load_config(&tmp.path().join("absent.json")),
            Err(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp.path().join("gateway.json");
        fs::write(
            &config_path,
            format!(r#"{{ "apis": [{}, {}] }}"#, api_json("a", "/a"), api_json("a", "/other")),
        )
        .expect("write");
        assert!(matches!(load_config(&config_path), Err(ConfigError::ValidationError { .. })));

        fs::write(&config_path, "{ not json").expect("write");
        assert!(matches!(load_config(&config_path), Err(ConfigError::ParseError { .. })));
    }
}

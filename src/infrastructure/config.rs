use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const STORE_JSON: &str = "store.json";
const DEFAULTS_JSON: &str = "defaults.json";
const DEFAULT_ACCOUNT_ID: &str = "default";
const DEFAULT_TOKEN_SERVICE: &str = "dawnblock-store";
const DEFAULT_ARRIVAL_TIME: &str = "09:00";

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub app: serde_json::Value,
    pub store: serde_json::Value,
    pub defaults: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub base_url: String,
    pub api_key: String,
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "DawnBlock",
                "timezone": "UTC",
                "accountId": DEFAULT_ACCOUNT_ID
            }),
        ),
        (
            STORE_JSON,
            serde_json::json!({
                "schema": 1,
                "baseUrl": null,
                "apiKey": null,
                "tokenService": DEFAULT_TOKEN_SERVICE
            }),
        ),
        (
            DEFAULTS_JSON,
            serde_json::json!({
                "schema": 1,
                "arrivalTime": DEFAULT_ARRIVAL_TIME
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    Ok(ConfigBundle {
        app: read_config(&config_dir.join(APP_JSON))?,
        store: read_config(&config_dir.join(STORE_JSON))?,
        defaults: read_config(&config_dir.join(DEFAULTS_JSON))?,
    })
}

fn normalize_account_id(account_id: &str) -> String {
    let normalized = account_id.trim();
    if normalized.is_empty() {
        DEFAULT_ACCOUNT_ID.to_string()
    } else {
        normalized.to_string()
    }
}

pub fn read_account_id(config_dir: &Path) -> Result<String, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(app
        .get("accountId")
        .and_then(serde_json::Value::as_str)
        .map(normalize_account_id)
        .unwrap_or_else(|| DEFAULT_ACCOUNT_ID.to_string()))
}

pub fn save_account_id(config_dir: &Path, account_id: &str) -> Result<(), InfraError> {
    let account_id = normalize_account_id(account_id);

    let path = config_dir.join(APP_JSON);
    let mut app = read_config(&path)?;
    let object = app.as_object_mut().ok_or_else(|| {
        InfraError::InvalidConfig(format!("invalid object structure in {}", path.display()))
    })?;
    object.insert(
        "accountId".to_string(),
        serde_json::Value::String(account_id),
    );

    let formatted = serde_json::to_string_pretty(&app)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(())
}

pub fn read_timezone(config_dir: &Path) -> Result<Option<String>, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(app
        .get("timezone")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned))
}

pub fn read_token_service(config_dir: &Path) -> Result<String, InfraError> {
    let store = read_config(&config_dir.join(STORE_JSON))?;
    let service = store
        .get("tokenService")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_TOKEN_SERVICE);
    Ok(service.to_string())
}

pub fn read_default_arrival(config_dir: &Path) -> Result<String, InfraError> {
    let defaults = read_config(&config_dir.join(DEFAULTS_JSON))?;
    let arrival = defaults
        .get("arrivalTime")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_ARRIVAL_TIME);
    Ok(arrival.to_string())
}

pub fn read_store_settings(config_dir: &Path) -> Result<Option<StoreSettings>, InfraError> {
    let path = config_dir.join(STORE_JSON);
    let store = read_config(&path)?;
    let base_url = store
        .get("baseUrl")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);
    let api_key = store
        .get("apiKey")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);

    match (base_url, api_key) {
        (Some(base_url), Some(api_key)) => Ok(Some(StoreSettings { base_url, api_key })),
        (None, None) => Ok(None),
        _ => Err(InfraError::InvalidConfig(format!(
            "both baseUrl and apiKey must be set in {}",
            path.display()
        ))),
    }
}

pub fn save_store_settings(
    config_dir: &Path,
    base_url: &str,
    api_key: &str,
) -> Result<(), InfraError> {
    let base_url = base_url.trim();
    let api_key = api_key.trim();
    if base_url.is_empty() {
        return Err(InfraError::InvalidConfig(
            "baseUrl must not be empty".to_string(),
        ));
    }
    if api_key.is_empty() {
        return Err(InfraError::InvalidConfig(
            "apiKey must not be empty".to_string(),
        ));
    }

    let path = config_dir.join(STORE_JSON);
    let mut store = read_config(&path)?;
    let object = store.as_object_mut().ok_or_else(|| {
        InfraError::InvalidConfig(format!("invalid object structure in {}", path.display()))
    })?;
    object.insert(
        "baseUrl".to_string(),
        serde_json::Value::String(base_url.to_string()),
    );
    object.insert(
        "apiKey".to_string(),
        serde_json::Value::String(api_key.to_string()),
    );

    let formatted = serde_json::to_string_pretty(&store)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(())
}

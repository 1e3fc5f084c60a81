//! Environment variable overrides.
//!
//! The variable names match the ones operators already export for the
//! controller tooling, so an existing shell profile keeps working.

use std::path::PathBuf;

use super::schema::StagehandConfig;

pub const ENV_CONTROLLER_URL: &str = "HOMEASSISTANT_URL";
pub const ENV_CONTROLLER_TOKEN: &str = "HOMEASSISTANT_TOKEN";
pub const ENV_SSH_HOST: &str = "HA_SSH_HOST";
pub const ENV_STAGING_PATH: &str = "HA_STAGING_PATH";
pub const ENV_CONFIG_PATH: &str = "HA_CONFIG_PATH";
pub const ENV_LOCAL_CONFIG: &str = "HA_LOCAL_CONFIG";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut StagehandConfig) {
    apply_env_overrides_with_lookup(config, |key| std::env::var(key).ok());
}

/// Apply overrides using a custom lookup. Empty values are ignored.
pub fn apply_env_overrides_with_lookup<F>(config: &mut StagehandConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(url) = get(ENV_CONTROLLER_URL) {
        config.controller.url = Some(url);
    }
    if let Some(token) = get(ENV_CONTROLLER_TOKEN) {
        config.controller.token = Some(token);
    }
    if let Some(host) = get(ENV_SSH_HOST) {
        config.remote.host = Some(host);
    }
    if let Some(path) = get(ENV_STAGING_PATH) {
        config.remote.staging_path = path;
    }
    if let Some(path) = get(ENV_CONFIG_PATH) {
        config.remote.config_path = path;
    }
    if let Some(path) = get(ENV_LOCAL_CONFIG) {
        config.local.path = PathBuf::from(path);
    }
}

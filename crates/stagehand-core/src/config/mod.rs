//! Layered configuration
//!
//! Resolution order, lowest to highest precedence:
//! - built-in defaults
//! - stagehand.toml (default location or an explicit path)
//! - environment variables
//! - command-line flags (applied by the frontend)

pub mod env;
pub mod parser;
pub mod paths;
pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

pub use env::{apply_env_overrides, apply_env_overrides_with_lookup};
pub use parser::{parse_stagehand_toml, parse_stagehand_toml_str, to_toml};
pub use paths::{default_config_path, expand_home};
pub use schema::{
    BackupSection, ControllerSection, LocalSection, PromoteSection, RemoteSection,
    StagehandConfig,
};

/// Errors raised while turning a loaded config into runtime settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not set (export {env} or set it in stagehand.toml)")]
    Missing {
        key: &'static str,
        env: &'static str,
    },

    #[error("invalid controller URL '{value}': {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Loads stagehand.toml from disk.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
    explicit: bool,
}

impl ConfigStore {
    /// Store backed by the default per-user location.
    pub fn from_default_location() -> anyhow::Result<Self> {
        let config_path = default_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(Self {
            config_path,
            explicit: false,
        })
    }

    /// Store backed by a path the operator named; it must exist.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            explicit: true,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the file, falling back to defaults when the default file is absent.
    pub fn load(&self) -> anyhow::Result<StagehandConfig> {
        if !self.config_path.exists() {
            if self.explicit {
                anyhow::bail!("Config file not found: {}", self.config_path.display());
            }
            tracing::debug!(path = %self.config_path.display(), "no config file, using defaults");
            return Ok(StagehandConfig::default());
        }
        parse_stagehand_toml(&self.config_path)
    }

    /// Load the file and apply environment overrides.
    pub fn load_layered(&self) -> anyhow::Result<StagehandConfig> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }
}

/// Resolved execution transport settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSettings {
    pub host: String,
    pub staging_path: String,
    pub config_path: String,
    pub identity_file: Option<PathBuf>,
    pub command_timeout: Duration,
    pub connect_timeout: Duration,
    pub secrets_timeout: Duration,
}

impl RemoteSettings {
    /// Anchored rsync pattern for the scratch directory when it lives inside
    /// the production tree, e.g. `/config_staging/`.
    pub fn staging_exclude(&self) -> Option<String> {
        let config = self.config_path.trim_end_matches('/');
        let staging = self.staging_path.trim_end_matches('/');
        let relative = staging.strip_prefix(config)?.strip_prefix('/')?;
        if relative.is_empty() {
            return None;
        }
        Some(format!("/{relative}/"))
    }
}

/// Resolved controller API settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub url: url::Url,
    pub token: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupSettings {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for BackupSettings {
    fn default() -> Self {
        BackupSection::default().into()
    }
}

impl From<BackupSection> for BackupSettings {
    fn from(section: BackupSection) -> Self {
        Self {
            timeout: Duration::from_secs(section.timeout_secs),
            poll_interval: Duration::from_secs(section.poll_interval_secs),
        }
    }
}

impl StagehandConfig {
    pub fn remote_settings(&self) -> Result<RemoteSettings, ConfigError> {
        let host = self
            .remote
            .host
            .clone()
            .filter(|h| !h.trim().is_empty())
            .ok_or(ConfigError::Missing {
                key: "remote.host",
                env: env::ENV_SSH_HOST,
            })?;

        Ok(RemoteSettings {
            host,
            staging_path: self.remote.staging_path.clone(),
            config_path: self.remote.config_path.clone(),
            identity_file: self.remote.identity_file.as_deref().map(expand_home),
            command_timeout: Duration::from_secs(self.remote.command_timeout_secs),
            connect_timeout: Duration::from_secs(self.remote.connect_timeout_secs),
            secrets_timeout: Duration::from_secs(self.remote.secrets_timeout_secs),
        })
    }

    pub fn controller_settings(&self) -> Result<ControllerSettings, ConfigError> {
        let raw = self.controller.url.clone().ok_or(ConfigError::Missing {
            key: "controller.url",
            env: env::ENV_CONTROLLER_URL,
        })?;
        let url = url::Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl {
            value: raw.clone(),
            source,
        })?;
        let token = self
            .controller
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing {
                key: "controller.token",
                env: env::ENV_CONTROLLER_TOKEN,
            })?;

        Ok(ControllerSettings {
            url,
            token,
            timeout: Duration::from_secs(self.controller.timeout_secs),
        })
    }

    pub fn backup_settings(&self) -> BackupSettings {
        self.backup.clone().into()
    }

    /// Local configuration directory with `~` expanded.
    pub fn local_path(&self) -> PathBuf {
        expand_home(&self.local.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_host_names_env_var() {
        let err = StagehandConfig::default().remote_settings().unwrap_err();
        assert!(err.to_string().contains("HA_SSH_HOST"), "{err}");
    }

    #[test]
    fn controller_settings_require_token() {
        let mut config = StagehandConfig::default();
        config.controller.url = Some("http://ha.local:8123".to_string());
        let err = config.controller_settings().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Missing {
                key: "controller.token",
                ..
            }
        ));

        config.controller.token = Some("secret".to_string());
        let settings = config.controller_settings().unwrap();
        assert_eq!(settings.url.as_str(), "http://ha.local:8123/");
        assert_eq!(settings.timeout, Duration::from_secs(120));
    }

    fn remote(staging_path: &str, config_path: &str) -> RemoteSettings {
        RemoteSettings {
            host: "root@ha".to_string(),
            staging_path: staging_path.to_string(),
            config_path: config_path.to_string(),
            identity_file: None,
            command_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
            secrets_timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn nested_staging_directory_is_excluded() {
        let nested = remote("/homeassistant/config_staging", "/homeassistant");
        assert_eq!(nested.staging_exclude().as_deref(), Some("/config_staging/"));

        let slashes = remote("/homeassistant/stage/next/", "/homeassistant/");
        assert_eq!(slashes.staging_exclude().as_deref(), Some("/stage/next/"));

        let root = remote("/config_staging", "/");
        assert_eq!(root.staging_exclude().as_deref(), Some("/config_staging/"));
    }

    #[test]
    fn sibling_staging_directory_needs_no_exclude() {
        assert_eq!(remote("/tmp/ha_staging", "/homeassistant").staging_exclude(), None);
        assert_eq!(
            remote("/homeassistant_staging", "/homeassistant").staging_exclude(),
            None
        );
        assert_eq!(remote("/homeassistant/", "/homeassistant").staging_exclude(), None);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = ConfigStore::from_path(temp.path().join("nope.toml"));
        assert!(store.load().is_err());
    }

    #[test]
    fn loads_file_from_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("stagehand.toml");
        std::fs::write(&path, "[remote]\nhost = \"root@ha\"\n").unwrap();

        let config = ConfigStore::from_path(&path).load().unwrap();
        let remote = config.remote_settings().unwrap();
        assert_eq!(remote.host, "root@ha");
        assert_eq!(remote.secrets_timeout, Duration::from_secs(30));
    }
}

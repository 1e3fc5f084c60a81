//! Schema for stagehand.toml.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_STAGING_PATH: &str = "/homeassistant/config_staging";
pub const DEFAULT_CONFIG_PATH: &str = "/homeassistant";
pub const DEFAULT_LOCAL_PATH: &str = "~/ha-config";

/// Root configuration document.
///
/// Every section is optional in the file; missing keys fall back to the
/// defaults below. Nothing in here can remove an entry from the protected
/// path set, `promote.extra_excludes` is strictly additive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagehandConfig {
    pub controller: ControllerSection,
    pub remote: RemoteSection,
    pub local: LocalSection,
    pub backup: BackupSection,
    pub promote: PromoteSection,
}

/// Controller REST API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSection {
    /// Base URL, e.g. `http://homeassistant.local:8123`
    pub url: Option<String>,
    /// Long-lived access token
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            timeout_secs: 120,
        }
    }
}

/// Execution transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSection {
    /// SSH destination, e.g. `root@homeassistant.local`
    pub host: Option<String>,
    /// Scratch directory that receives staged configuration
    pub staging_path: String,
    /// Live configuration directory
    pub config_path: String,
    /// Optional identity file passed to ssh with `-i`
    pub identity_file: Option<PathBuf>,
    pub command_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub secrets_timeout_secs: u64,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            host: None,
            staging_path: DEFAULT_STAGING_PATH.to_string(),
            config_path: DEFAULT_CONFIG_PATH.to_string(),
            identity_file: None,
            command_timeout_secs: 120,
            connect_timeout_secs: 10,
            secrets_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSection {
    /// Local configuration repository; `~` is expanded
    pub path: PathBuf,
}

impl Default for LocalSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LOCAL_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSection {
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for BackupSection {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            poll_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromoteSection {
    /// Additional rsync exclude patterns applied on top of the protected set
    pub extra_excludes: Vec<String>,
}

impl StagehandConfig {
    /// Check internal consistency after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(url) = &self.controller.url {
            url::Url::parse(url)
                .map_err(|e| anyhow::anyhow!("Invalid controller.url '{}': {}", url, e))?;
        }

        let timeouts = [
            ("controller.timeout_secs", self.controller.timeout_secs),
            ("remote.command_timeout_secs", self.remote.command_timeout_secs),
            ("remote.connect_timeout_secs", self.remote.connect_timeout_secs),
            ("remote.secrets_timeout_secs", self.remote.secrets_timeout_secs),
            ("backup.timeout_secs", self.backup.timeout_secs),
            ("backup.poll_interval_secs", self.backup.poll_interval_secs),
        ];
        for (key, value) in timeouts {
            if value == 0 {
                anyhow::bail!("{} must be greater than zero", key);
            }
        }

        for (key, path) in [
            ("remote.staging_path", &self.remote.staging_path),
            ("remote.config_path", &self.remote.config_path),
        ] {
            if !path.starts_with('/') {
                anyhow::bail!("{} must be an absolute path, got '{}'", key, path);
            }
        }

        if normalize_remote(&self.remote.staging_path) == normalize_remote(&self.remote.config_path)
        {
            anyhow::bail!("remote.staging_path must differ from remote.config_path");
        }

        for pattern in &self.promote.extra_excludes {
            if pattern.trim().is_empty() {
                anyhow::bail!("promote.extra_excludes contains an empty pattern");
            }
        }

        Ok(())
    }
}

fn normalize_remote(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        StagehandConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_identical_staging_and_production() {
        let mut config = StagehandConfig::default();
        config.remote.staging_path = "/homeassistant/".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("must differ"), "{err}");
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let mut config = StagehandConfig::default();
        config.backup.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_url() {
        let mut config = StagehandConfig::default();
        config.controller.url = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }
}

//! Validate command: local syntax check plus an optional push to staging.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::RemoteSettings;
use crate::deploy::{StepPayload, StepResult, push_to_staging, reconcile_secrets};
use crate::remote::RemoteExecutor;
use crate::tree::{ConfigTree, TreeValidation, validate_tree};

/// Options for the validate command
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    /// Local configuration directory
    pub local_path: PathBuf,
    /// Only check syntax locally
    pub skip_push: bool,
}

impl ValidateOptions {
    pub fn new(local_path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: local_path.into(),
            skip_push: false,
        }
    }

    pub fn with_skip_push(mut self, skip_push: bool) -> Self {
        self.skip_push = skip_push;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateReport {
    pub valid: bool,
    pub path: PathBuf,
    pub yaml: TreeValidation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging: Option<StepResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets: Option<StepResult>,
    pub files_transferred: usize,
}

impl ValidateReport {
    pub fn exit_code(&self) -> i32 {
        if self.valid { 0 } else { 1 }
    }
}

/// Runs the validate command
pub struct ValidateCommand<'a> {
    remote: Option<(&'a dyn RemoteExecutor, &'a RemoteSettings)>,
}

impl<'a> ValidateCommand<'a> {
    /// Command that can only run with `skip_push`.
    pub fn local_only() -> Self {
        Self { remote: None }
    }

    pub fn with_remote(executor: &'a dyn RemoteExecutor, settings: &'a RemoteSettings) -> Self {
        Self {
            remote: Some((executor, settings)),
        }
    }

    pub async fn execute(&self, options: &ValidateOptions) -> anyhow::Result<ValidateReport> {
        let tree = ConfigTree::open(&options.local_path)?;
        let yaml = validate_tree(&tree)?;
        let syntax_ok = yaml.all_valid();

        let mut report = ValidateReport {
            valid: syntax_ok,
            path: options.local_path.clone(),
            yaml,
            staging: None,
            secrets: None,
            files_transferred: 0,
        };

        if options.skip_push || !syntax_ok {
            return Ok(report);
        }

        let (executor, settings) = self
            .remote
            .ok_or_else(|| anyhow::anyhow!("A remote host is required unless --skip-push is set"))?;

        let staging = push_to_staging(executor, tree.root(), settings).await;
        if let Some(StepPayload::Transfer(summary)) = &staging.payload {
            report.files_transferred = summary.files_transferred;
        }
        report.valid = staging.is_success();
        if staging.is_success() {
            report.secrets = Some(reconcile_secrets(executor, settings).await);
        }
        report.staging = Some(staging);

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeExecutor;
    use tempfile::TempDir;

    #[tokio::test]
    async fn skip_push_needs_no_remote() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("configuration.yaml"), "homeassistant:\n").unwrap();

        let options = ValidateOptions::new(temp.path()).with_skip_push(true);
        let report = ValidateCommand::local_only().execute(&options).await.unwrap();
        assert!(report.valid);
        assert!(report.staging.is_none());
    }

    #[tokio::test]
    async fn syntax_errors_skip_the_push() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("bad.yaml"), "list: [1, 2\n").unwrap();

        let executor = FakeExecutor::default();
        let settings = RemoteSettings {
            host: "root@ha".to_string(),
            staging_path: "/homeassistant/config_staging".to_string(),
            config_path: "/homeassistant".to_string(),
            identity_file: None,
            command_timeout: std::time::Duration::from_secs(120),
            connect_timeout: std::time::Duration::from_secs(10),
            secrets_timeout: std::time::Duration::from_secs(30),
        };
        let report = ValidateCommand::with_remote(&executor, &settings)
            .execute(&ValidateOptions::new(temp.path()))
            .await
            .unwrap();
        assert!(!report.valid);
        assert_eq!(report.exit_code(), 1);
        assert!(executor.calls().is_empty());
    }
}

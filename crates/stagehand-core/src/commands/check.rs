//! Check command: non-mutating readiness checks for a deployment.

use serde::{Deserialize, Serialize};

use super::init::CONNECTIVITY_TIMEOUT;
use crate::config::RemoteSettings;
use crate::controller::ControllerApi;
use crate::remote::{CommandOutput, RemoteExecutor, TransportError};

/// Severity level for issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Check passed
    Ok,
    /// Deployment will work but something looks off
    Warning,
    /// Deployment will fail
    Error,
}

/// Outcome of one readiness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreflightIssue {
    pub check: String,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl PreflightIssue {
    fn new(check: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            check: check.to_string(),
            severity,
            message: message.into(),
            remediation: None,
        }
    }

    fn with_remediation(mut self, remediation: &str) -> Self {
        self.remediation = Some(remediation.to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub target: String,
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_version: Option<String>,
    pub checks: Vec<PreflightIssue>,
}

impl CheckReport {
    pub fn exit_code(&self) -> i32 {
        if self.ready { 0 } else { 1 }
    }
}

pub struct CheckCommand<'a> {
    executor: &'a dyn RemoteExecutor,
    controller: &'a dyn ControllerApi,
    remote: &'a RemoteSettings,
}

impl<'a> CheckCommand<'a> {
    pub fn new(
        executor: &'a dyn RemoteExecutor,
        controller: &'a dyn ControllerApi,
        remote: &'a RemoteSettings,
    ) -> Self {
        Self {
            executor,
            controller,
            remote,
        }
    }

    pub async fn execute(&self) -> CheckReport {
        let mut checks = Vec::new();
        let mut controller_version = None;

        self.remote_checks(&mut checks).await;

        match self.controller.get_config().await {
            Ok(info) => {
                let version = info.version.clone().unwrap_or_else(|| "unknown".to_string());
                let location = info
                    .location_name
                    .map(|name| format!(" at '{name}'"))
                    .unwrap_or_default();
                checks.push(PreflightIssue::new(
                    "api",
                    Severity::Ok,
                    format!("Controller API reachable, version {version}{location}"),
                ));
                controller_version = info.version;
            }
            Err(e) => checks.push(
                PreflightIssue::new("api", Severity::Error, format!("Controller API unreachable: {e}"))
                    .with_remediation("Check HOMEASSISTANT_URL and HOMEASSISTANT_TOKEN"),
            ),
        }

        match self.controller.list_backups().await {
            Ok(listing) => checks.push(PreflightIssue::new(
                "backup_listing",
                Severity::Ok,
                format!("Backup listing available ({} backups)", listing.len()),
            )),
            Err(e) => checks.push(PreflightIssue::new(
                "backup_listing",
                Severity::Warning,
                format!("Backups cannot be verified: {e}"),
            )),
        }

        let ready = checks.iter().all(|c| c.severity < Severity::Error);
        CheckReport {
            target: self.executor.target().to_string(),
            ready,
            controller_version,
            checks,
        }
    }

    /// Remote checks stop after the ssh check when ssh itself is unusable.
    async fn remote_checks(&self, checks: &mut Vec<PreflightIssue>) {
        match self.executor.run(&["echo", "ok"], CONNECTIVITY_TIMEOUT).await {
            Ok(output) if output.success() && output.stdout.contains("ok") => {
                checks.push(PreflightIssue::new("ssh", Severity::Ok, "SSH connection works"));
            }
            Ok(output) => {
                checks.push(
                    PreflightIssue::new(
                        "ssh",
                        Severity::Error,
                        format!("SSH check failed: {}", output.failure_detail()),
                    )
                    .with_remediation("Verify HA_SSH_HOST and that key-based login works"),
                );
                return;
            }
            Err(e) => {
                checks.push(
                    PreflightIssue::new("ssh", Severity::Error, format!("Cannot connect via SSH: {e}"))
                        .with_remediation("Verify HA_SSH_HOST and that key-based login works"),
                );
                return;
            }
        }

        let timeout = self.remote.command_timeout;
        let production = self.remote.config_path.as_str();
        let staging = self.remote.staging_path.as_str();

        let result = self.executor.run(&["test", "-d", production], timeout).await;
        checks.push(if succeeded(&result) {
            PreflightIssue::new("production_dir", Severity::Ok, format!("{production} exists"))
        } else {
            PreflightIssue::new(
                "production_dir",
                Severity::Error,
                format!("{production} not found on the controller"),
            )
            .with_remediation("Set HA_CONFIG_PATH to the controller's config directory")
        });

        let result = self.executor.run(&["test", "-d", staging], timeout).await;
        checks.push(if succeeded(&result) {
            PreflightIssue::new("staging_dir", Severity::Ok, format!("{staging} exists"))
        } else {
            PreflightIssue::new(
                "staging_dir",
                Severity::Warning,
                format!("{staging} does not exist yet"),
            )
            .with_remediation("It is created by the first push, or run `stagehand init`")
        });

        let result = self.executor.run(&["rsync", "--version"], timeout).await;
        checks.push(if succeeded(&result) {
            PreflightIssue::new("rsync", Severity::Ok, "rsync available on the controller")
        } else {
            PreflightIssue::new("rsync", Severity::Error, "rsync not found on the controller")
                .with_remediation("Install rsync in the SSH add-on")
        });
    }
}

fn succeeded(result: &Result<CommandOutput, TransportError>) -> bool {
    matches!(result, Ok(output) if output.success())
}

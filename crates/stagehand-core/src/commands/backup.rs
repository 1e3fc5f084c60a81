//! Backup command: trigger a backup, optionally waiting for it.

use std::time::Duration;

use serde::Serialize;

use crate::config::BackupSettings;
use crate::controller::{BackupEndpoint, ControllerApi};
use crate::deploy::{BackupError, BackupHandle, BackupOrchestrator, BackupOutcome};

/// Options for the backup command
#[derive(Debug, Clone, Default)]
pub struct BackupOptions {
    /// Return right after the trigger
    pub no_wait: bool,
    /// Overrides the configured wait budget
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    Initiated,
    Completed,
    Unverifiable,
    Timeout,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub success: bool,
    pub status: BackupStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<BackupEndpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupHandle>,
    pub message: String,
}

impl BackupReport {
    fn new(status: BackupStatus, message: impl Into<String>) -> Self {
        Self {
            success: !matches!(status, BackupStatus::Timeout | BackupStatus::Failed),
            status,
            endpoint: None,
            backup: None,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.success { 0 } else { 1 }
    }
}

pub struct BackupCommand<'a> {
    api: &'a dyn ControllerApi,
    settings: BackupSettings,
}

impl<'a> BackupCommand<'a> {
    pub fn new(api: &'a dyn ControllerApi, settings: BackupSettings) -> Self {
        Self { api, settings }
    }

    pub async fn execute(&self, options: &BackupOptions) -> BackupReport {
        let mut settings = self.settings;
        if let Some(timeout) = options.timeout {
            settings.timeout = timeout;
        }
        let orchestrator = BackupOrchestrator::new(self.api, settings);

        if options.no_wait {
            return match orchestrator.trigger().await {
                Ok(endpoint) => {
                    let mut report = BackupReport::new(
                        BackupStatus::Initiated,
                        "Backup initiated (not waiting for completion)",
                    );
                    report.endpoint = Some(endpoint);
                    report
                }
                Err(e) => BackupReport::new(
                    BackupStatus::Failed,
                    format!("failed to trigger backup: {e}"),
                ),
            };
        }

        match orchestrator.snapshot().await {
            Ok(BackupOutcome::Created(handle)) => {
                let mut report = BackupReport::new(
                    BackupStatus::Completed,
                    format!("Backup completed: {}", handle.id),
                );
                report.backup = Some(handle);
                report
            }
            Ok(BackupOutcome::Unverifiable(reason)) => {
                BackupReport::new(BackupStatus::Unverifiable, reason)
            }
            Err(e @ BackupError::Timeout(_)) => {
                BackupReport::new(BackupStatus::Timeout, e.to_string())
            }
            Err(e) => BackupReport::new(BackupStatus::Failed, e.to_string()),
        }
    }
}

//! Pipeline coordinator.
//!
//! Steps never propagate errors; each returns a [`StepResult`] and only this
//! module decides whether the run continues.

use std::path::PathBuf;

use super::backup::{BackupOrchestrator, backup_step};
use super::promote::promote;
use super::reload::{reload_all, reload_step};
use super::report::{DeploymentReport, StepName, StepPayload, StepResult};
use super::secrets::reconcile_secrets;
use super::staging::push_to_staging;
use super::verify::{CheckVerdict, remote_verify, verify_step};
use crate::config::{BackupSettings, RemoteSettings};
use crate::controller::ControllerApi;
use crate::remote::RemoteExecutor;
use crate::tree::{ConfigTree, TreeValidation, validate_tree};

pub const ABORT_VALIDATION: &str = "local validation failed";
pub const ABORT_STAGING: &str = "staging push failed";
pub const ABORT_BACKUP: &str = "backup failed";
pub const ABORT_PROMOTE: &str = "deploy failed";

/// Options for one deployment run
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Local configuration directory
    pub local_path: PathBuf,
    /// Take a backup before promoting
    pub backup: bool,
    /// Preview the promotion without changing production
    pub dry_run: bool,
    /// Patterns excluded from promotion on top of the protected set
    pub extra_excludes: Vec<String>,
}

impl DeployOptions {
    pub fn new(local_path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: local_path.into(),
            backup: true,
            dry_run: false,
            extra_excludes: Vec::new(),
        }
    }

    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.extra_excludes = excludes;
        self
    }
}

pub struct DeployPipeline<'a> {
    executor: &'a dyn RemoteExecutor,
    controller: &'a dyn ControllerApi,
    remote: RemoteSettings,
    backup: BackupSettings,
}

impl<'a> DeployPipeline<'a> {
    pub fn new(
        executor: &'a dyn RemoteExecutor,
        controller: &'a dyn ControllerApi,
        remote: RemoteSettings,
        backup: BackupSettings,
    ) -> Self {
        Self {
            executor,
            controller,
            remote,
            backup,
        }
    }

    /// Run every step in order and return the aggregated report.
    pub async fn run(&self, options: &DeployOptions) -> DeploymentReport {
        let mut report = DeploymentReport::new(self.executor.target(), options.dry_run);
        tracing::info!(
            target_host = %self.executor.target(),
            local = %options.local_path.display(),
            dry_run = options.dry_run,
            "starting deployment"
        );

        let validation = validate_step(options);
        let valid = validation.is_success();
        report.record(validation);
        if !valid {
            return report.abort(ABORT_VALIDATION);
        }

        let staging = push_to_staging(self.executor, &options.local_path, &self.remote).await;
        let staged = staging.is_success();
        report.record(staging);
        if !staged {
            return report.abort(ABORT_STAGING);
        }

        report.record(reconcile_secrets(self.executor, &self.remote).await);

        if options.dry_run {
            let preview =
                promote(self.executor, &self.remote, &options.extra_excludes, true).await;
            report.record(preview);
            return report.finish(true);
        }

        if options.backup {
            let orchestrator = BackupOrchestrator::new(self.controller, self.backup);
            let step = backup_step(orchestrator.snapshot().await);
            let failed = step.is_failure();
            report.record(step);
            if failed {
                return report.abort(ABORT_BACKUP);
            }
        } else {
            report.record(StepResult::skipped(
                StepName::Backup,
                "backup disabled for this run",
            ));
        }

        let promotion =
            promote(self.executor, &self.remote, &options.extra_excludes, false).await;
        let promoted = promotion.is_success();
        report.record(promotion);
        if !promoted {
            return report.abort(ABORT_PROMOTE);
        }

        let verdict = remote_verify(self.executor, self.remote.command_timeout).await;
        let verify_ok = !matches!(verdict, CheckVerdict::Invalid { .. });
        report.record(verify_step(verdict));

        let reload = reload_all(self.controller).await;
        let reload_ok = reload.success();
        report.record(reload_step(reload));

        let overall = promoted && verify_ok && reload_ok;
        tracing::info!(success = overall, "deployment finished");
        report.finish(overall)
    }
}

fn validate_step(options: &DeployOptions) -> StepResult {
    let validation = ConfigTree::open(&options.local_path).and_then(|tree| validate_tree(&tree));
    match validation {
        Ok(results) => validation_result(results),
        Err(e) => StepResult::failure(StepName::Validate, "could not read local tree", format!("{e:#}")),
    }
}

/// Step result for a finished tree validation.
pub fn validation_result(results: TreeValidation) -> StepResult {
    let total = results.files.len();
    let step = if results.all_valid() {
        StepResult::success(StepName::Validate, format!("{total} documents valid"))
    } else {
        let failed: Vec<&str> = results.failures().map(|f| f.file.as_str()).collect();
        StepResult::failure(
            StepName::Validate,
            format!("{} of {} documents have syntax errors", failed.len(), total),
            format!("YAML syntax errors in: {}", failed.join(", ")),
        )
    };
    step.with_payload(StepPayload::Validation(results))
}

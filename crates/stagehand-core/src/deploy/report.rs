//! Step results and the aggregated deployment report.

use std::fmt;

use serde::Serialize;

use super::backup::BackupHandle;
use super::reload::ReloadSummary;
use super::verify::CheckVerdict;
use crate::tree::TreeValidation;

/// Pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    Validate,
    Stage,
    ReconcileSecrets,
    Backup,
    Promote,
    RemoteVerify,
    Reload,
}

impl StepName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Stage => "stage",
            Self::ReconcileSecrets => "reconcile_secrets",
            Self::Backup => "backup",
            Self::Promote => "promote",
            Self::RemoteVerify => "remote_verify",
            Self::Reload => "reload",
        }
    }

    /// Heading used by the text renderer.
    pub fn label(self) -> &'static str {
        match self {
            Self::Validate => "YAML Validation",
            Self::Stage => "Push to Staging",
            Self::ReconcileSecrets => "Secrets",
            Self::Backup => "Backup",
            Self::Promote => "Deploy to Production",
            Self::RemoteVerify => "Core Check",
            Self::Reload => "Reload",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Success,
    Failure,
    Skipped,
}

/// Files moved by a tree sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferSummary {
    pub files_transferred: usize,
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deleted: Vec<String>,
}

/// Step-specific structured data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPayload {
    Validation(TreeValidation),
    Transfer(TransferSummary),
    Backup(BackupHandle),
    Verify(CheckVerdict),
    Reload(ReloadSummary),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub name: StepName,
    pub outcome: StepOutcome,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<StepPayload>,
}

impl StepResult {
    pub fn success(name: StepName, detail: impl Into<String>) -> Self {
        Self {
            name,
            outcome: StepOutcome::Success,
            detail: detail.into(),
            error: None,
            payload: None,
        }
    }

    pub fn failure(name: StepName, detail: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name,
            outcome: StepOutcome::Failure,
            detail: detail.into(),
            error: Some(error.into()),
            payload: None,
        }
    }

    pub fn skipped(name: StepName, note: impl Into<String>) -> Self {
        Self {
            name,
            outcome: StepOutcome::Skipped,
            detail: note.into(),
            error: None,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: StepPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome == StepOutcome::Success
    }

    pub fn is_failure(&self) -> bool {
        self.outcome == StepOutcome::Failure
    }
}

/// Aggregated outcome of one run, emitted once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentReport {
    pub target: String,
    pub dry_run: bool,
    pub steps: Vec<StepResult>,
    pub overall_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
}

impl DeploymentReport {
    pub fn new(target: impl Into<String>, dry_run: bool) -> Self {
        Self {
            target: target.into(),
            dry_run,
            steps: Vec::new(),
            overall_success: false,
            abort_reason: None,
        }
    }

    pub fn record(&mut self, step: StepResult) {
        tracing::info!(
            step = %step.name,
            outcome = ?step.outcome,
            detail = %step.detail,
            "step finished"
        );
        self.steps.push(step);
    }

    /// Stop the run; no later step executes.
    pub fn abort(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(reason = %reason, "deployment aborted");
        self.overall_success = false;
        self.abort_reason = Some(reason);
        self
    }

    pub fn finish(mut self, overall_success: bool) -> Self {
        self.overall_success = overall_success;
        self
    }

    pub fn step(&self, name: StepName) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn exit_code(&self) -> i32 {
        if self.overall_success { 0 } else { 1 }
    }
}

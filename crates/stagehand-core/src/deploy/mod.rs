//! Staged deployment: validate, stage, back up, promote, verify, reload.

pub mod backup;
pub mod pipeline;
pub mod promote;
pub mod reload;
pub mod render;
pub mod report;
pub mod secrets;
pub mod staging;
pub mod verify;

pub use backup::{BackupError, BackupHandle, BackupOrchestrator, BackupOutcome, backup_step};
pub use pipeline::{
    ABORT_BACKUP, ABORT_PROMOTE, ABORT_STAGING, ABORT_VALIDATION, DeployOptions, DeployPipeline,
    validation_result,
};
pub use promote::{promote, promotion_request};
pub use reload::{RELOAD_OPERATIONS, ReloadError, ReloadSummary, reload_all, reload_step};
pub use render::render_text;
pub use report::{
    DeploymentReport, StepName, StepOutcome, StepPayload, StepResult, TransferSummary,
};
pub use secrets::{reconcile_secrets, secrets_copy_argv};
pub use staging::{push_to_staging, staging_request};
pub use verify::{CHECK_COMMAND, CheckVerdict, classify, remote_verify, verify_step};

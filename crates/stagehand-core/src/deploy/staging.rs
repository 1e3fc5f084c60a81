//! Push the local tree into the scratch directory on the controller.

use std::path::Path;

use super::report::{StepName, StepPayload, StepResult, TransferSummary};
use crate::config::RemoteSettings;
use crate::remote::{RemoteExecutor, SyncDirection, SyncOutcome, SyncRequest};
use crate::tree::staging_excludes;

/// Mirror request for `local_root` into the scratch path.
pub fn staging_request(local_root: &Path, remote: &RemoteSettings) -> SyncRequest {
    SyncRequest::new(
        SyncDirection::Push,
        local_root.display().to_string(),
        remote.staging_path.clone(),
        remote.command_timeout,
    )
    .with_excludes(staging_excludes())
    .with_delete(true)
}

pub async fn push_to_staging(
    executor: &dyn RemoteExecutor,
    local_root: &Path,
    remote: &RemoteSettings,
) -> StepResult {
    let request = staging_request(local_root, remote);
    match executor.sync_tree(&request).await {
        Ok(outcome) if outcome.success => {
            let summary = transfer_summary(&outcome);
            StepResult::success(
                StepName::Stage,
                format!(
                    "Pushed {} files to {}",
                    summary.files_transferred, remote.staging_path
                ),
            )
            .with_payload(StepPayload::Transfer(summary))
        }
        Ok(outcome) => StepResult::failure(
            StepName::Stage,
            format!("rsync exited with code {}", outcome.exit_code),
            outcome.detail,
        ),
        Err(e) => StepResult::failure(StepName::Stage, "transport error", e.to_string()),
    }
}

pub(crate) fn transfer_summary(outcome: &SyncOutcome) -> TransferSummary {
    TransferSummary {
        files_transferred: outcome.transferred.len(),
        files: outcome.transferred.clone(),
        deleted: outcome.deleted.clone(),
    }
}

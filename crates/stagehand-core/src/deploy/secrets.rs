//! Best-effort copy of the production secrets file into the scratch directory.

use super::report::{StepName, StepResult};
use crate::config::RemoteSettings;
use crate::remote::{RemoteExecutor, remote_join};
use crate::tree::SECRETS_FILE;

/// `cp` argv run on the controller.
pub fn secrets_copy_argv(remote: &RemoteSettings) -> [String; 3] {
    [
        "cp".to_string(),
        remote_join(&remote.config_path, SECRETS_FILE),
        remote_join(&remote.staging_path, SECRETS_FILE),
    ]
}

/// Never fails: every problem becomes a skipped step.
pub async fn reconcile_secrets(executor: &dyn RemoteExecutor, remote: &RemoteSettings) -> StepResult {
    let argv = secrets_copy_argv(remote);
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();

    match executor.run(&argv, remote.secrets_timeout).await {
        Ok(output) if output.success() => StepResult::success(
            StepName::ReconcileSecrets,
            format!("Copied {} into staging", SECRETS_FILE),
        ),
        Ok(output) => StepResult::skipped(
            StepName::ReconcileSecrets,
            format!("{} not copied: {}", SECRETS_FILE, output.failure_detail()),
        ),
        Err(e) => StepResult::skipped(
            StepName::ReconcileSecrets,
            format!("{} not copied: {}", SECRETS_FILE, e),
        ),
    }
}

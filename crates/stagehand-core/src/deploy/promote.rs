//! Mirror the scratch directory into production.

use super::report::{StepName, StepPayload, StepResult};
use super::staging::transfer_summary;
use crate::config::RemoteSettings;
use crate::remote::{RemoteExecutor, SyncDirection, SyncRequest};
use crate::tree::promotion_excludes;

/// Promotion request; the protected set is always part of the excludes, and
/// so is the scratch directory when it sits inside production.
pub fn promotion_request(remote: &RemoteSettings, extra_excludes: &[String], dry_run: bool) -> SyncRequest {
    let extras: Vec<String> = remote
        .staging_exclude()
        .into_iter()
        .chain(extra_excludes.iter().cloned())
        .collect();
    SyncRequest::new(
        SyncDirection::Within,
        remote.staging_path.clone(),
        remote.config_path.clone(),
        remote.command_timeout,
    )
    .with_excludes(promotion_excludes(&extras))
    .with_delete(true)
    .with_dry_run(dry_run)
}

pub async fn promote(
    executor: &dyn RemoteExecutor,
    remote: &RemoteSettings,
    extra_excludes: &[String],
    dry_run: bool,
) -> StepResult {
    let request = promotion_request(remote, extra_excludes, dry_run);
    match executor.sync_tree(&request).await {
        Ok(outcome) if outcome.success => {
            let summary = transfer_summary(&outcome);
            let detail = if dry_run {
                format!(
                    "Dry run: {} changes would be applied to {}",
                    summary.files_transferred, remote.config_path
                )
            } else {
                format!(
                    "Promoted {} files to {}",
                    summary.files_transferred, remote.config_path
                )
            };
            StepResult::success(StepName::Promote, detail)
                .with_payload(StepPayload::Transfer(summary))
        }
        Ok(outcome) => StepResult::failure(
            StepName::Promote,
            format!("rsync exited with code {}", outcome.exit_code),
            outcome.detail,
        ),
        Err(e) => StepResult::failure(StepName::Promote, "transport error", e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::tree::PROTECTED_PATHS;

    fn remote() -> RemoteSettings {
        RemoteSettings {
            host: "root@ha".to_string(),
            staging_path: "/homeassistant/config_staging".to_string(),
            config_path: "/homeassistant".to_string(),
            identity_file: None,
            command_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
            secrets_timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn nested_staging_is_never_deleted_by_promotion() {
        let request = promotion_request(&remote(), &["www/".to_string()], false);

        let mut expected: Vec<String> = PROTECTED_PATHS.iter().map(|p| p.to_string()).collect();
        expected.push("/config_staging/".to_string());
        expected.push("www/".to_string());

        assert_eq!(request.direction, SyncDirection::Within);
        assert_eq!(request.source, "/homeassistant/config_staging");
        assert_eq!(request.destination, "/homeassistant");
        assert_eq!(request.excludes, expected);
        assert!(request.delete);
        assert!(!request.dry_run);
    }

    #[test]
    fn sibling_staging_adds_no_exclude() {
        let mut remote = remote();
        remote.staging_path = "/tmp/ha_staging".to_string();
        let request = promotion_request(&remote, &[], true);
        assert_eq!(request.excludes, PROTECTED_PATHS);
        assert!(request.dry_run);
    }
}

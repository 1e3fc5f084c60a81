//! Human-readable deployment report.

use super::report::{DeploymentReport, StepOutcome, StepPayload, StepResult};

const RULE_WIDTH: usize = 80;
const RELOADED_PREVIEW: usize = 5;

pub fn render_text(report: &DeploymentReport) -> String {
    let mut lines = vec![
        String::new(),
        "=".repeat(RULE_WIDTH),
        format!("Home Assistant Config Deployment ({})", report.target),
        "=".repeat(RULE_WIDTH),
        String::new(),
    ];

    for step in &report.steps {
        render_step(step, &mut lines);
    }

    lines.push(String::new());
    lines.push("-".repeat(RULE_WIDTH));
    if report.overall_success {
        lines.push("✓ DEPLOYMENT SUCCESSFUL".to_string());
    } else {
        lines.push("✗ DEPLOYMENT FAILED".to_string());
        if let Some(reason) = &report.abort_reason {
            lines.push(format!("   Aborted: {reason}"));
        }
    }
    if report.dry_run {
        lines.push("Dry run mode - no changes made".to_string());
    }
    lines.push(String::new());

    lines.join("\n")
}

fn render_step(step: &StepResult, lines: &mut Vec<String>) {
    let label = step.name.label();
    match step.outcome {
        StepOutcome::Skipped => {
            if step.detail.is_empty() {
                lines.push(format!("{label}: - Skipped"));
            } else {
                lines.push(format!("{label}: - Skipped ({})", step.detail));
            }
        }
        StepOutcome::Success => {
            lines.push(format!("{label}: ✓ Success"));
            match &step.payload {
                Some(StepPayload::Backup(handle)) => {
                    lines.push(format!("   Backup ID: {}", handle.id));
                }
                Some(StepPayload::Reload(summary)) if !summary.reloaded.is_empty() => {
                    let shown: Vec<&str> = summary
                        .reloaded
                        .iter()
                        .take(RELOADED_PREVIEW)
                        .map(String::as_str)
                        .collect();
                    let more = if summary.reloaded.len() > RELOADED_PREVIEW { "..." } else { "" };
                    lines.push(format!("   Reloaded: {}{more}", shown.join(", ")));
                }
                Some(StepPayload::Transfer(_)) => lines.push(format!("   {}", step.detail)),
                _ => {}
            }
        }
        StepOutcome::Failure => {
            lines.push(format!("{label}: ✗ Failed"));
            if let Some(error) = &step.error {
                lines.push(format!("   Error: {}", error.trim_end()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::backup::BackupHandle;
    use crate::deploy::report::StepName;

    #[test]
    fn successful_run_lists_backup_id() {
        let mut report = DeploymentReport::new("root@ha", false);
        report.record(
            StepResult::success(StepName::Backup, "Backup created: abc123").with_payload(
                StepPayload::Backup(BackupHandle {
                    id: "abc123".to_string(),
                    name: None,
                    created_at: None,
                    size_bytes: None,
                }),
            ),
        );
        let text = render_text(&report.finish(true));
        assert!(text.contains("Backup: ✓ Success"));
        assert!(text.contains("   Backup ID: abc123"));
        assert!(text.contains("DEPLOYMENT SUCCESSFUL"));
    }

    #[test]
    fn aborted_run_names_reason() {
        let mut report = DeploymentReport::new("root@ha", false);
        report.record(StepResult::failure(
            StepName::Validate,
            "1 of 2 documents have syntax errors",
            "YAML syntax errors in: bad.yaml",
        ));
        let text = render_text(&report.abort("local validation failed"));
        assert!(text.contains("YAML Validation: ✗ Failed"));
        assert!(text.contains("   Error: YAML syntax errors in: bad.yaml"));
        assert!(text.contains("   Aborted: local validation failed"));
        assert!(!text.contains("Dry run"));
    }

    #[test]
    fn dry_run_adds_note() {
        let report = DeploymentReport::new("root@ha", true).finish(true);
        assert!(render_text(&report).contains("Dry run mode - no changes made"));
    }
}

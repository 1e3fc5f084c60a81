//! Controller-side configuration check.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::report::{StepName, StepPayload, StepResult};
use crate::remote::{CommandOutput, RemoteExecutor, TransportError};

/// Command the controller's supervisor CLI exposes for a config check.
pub const CHECK_COMMAND: &[&str] = &["ha", "core", "check", "--raw-json"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum CheckVerdict {
    Valid { detail: String },
    Invalid { message: String },
    /// The check could not run or its answer could not be interpreted.
    Unsupported { reason: String },
}

pub async fn remote_verify(executor: &dyn RemoteExecutor, timeout: Duration) -> CheckVerdict {
    classify(executor.run(CHECK_COMMAND, timeout).await)
}

/// Normalize the raw check result; the first matching rule wins.
pub fn classify(result: Result<CommandOutput, TransportError>) -> CheckVerdict {
    let output = match result {
        Ok(output) => output,
        Err(e) => {
            return CheckVerdict::Unsupported {
                reason: e.to_string(),
            };
        }
    };

    // Heuristic: the supervisor CLI reports a missing token in plain text.
    if mentions_unauthorized(&output.stdout) || mentions_unauthorized(&output.stderr) {
        return CheckVerdict::Unsupported {
            reason: "core check not authorized from this session".to_string(),
        };
    }

    if let Ok(Value::Object(body)) = serde_json::from_str::<Value>(output.stdout.trim()) {
        return if body.get("result").and_then(Value::as_str) == Some("ok") {
            CheckVerdict::Valid {
                detail: "Configuration valid".to_string(),
            }
        } else {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(body.clone()).to_string());
            CheckVerdict::Invalid { message }
        };
    }

    if output.success() {
        return CheckVerdict::Valid {
            detail: output.stdout.trim().to_string(),
        };
    }

    CheckVerdict::Unsupported {
        reason: output.failure_detail(),
    }
}

fn mentions_unauthorized(text: &str) -> bool {
    text.to_lowercase().contains("unauthorized")
}

pub fn verify_step(verdict: CheckVerdict) -> StepResult {
    let step = match &verdict {
        CheckVerdict::Valid { detail } => StepResult::success(StepName::RemoteVerify, detail.clone()),
        CheckVerdict::Invalid { message } => StepResult::failure(
            StepName::RemoteVerify,
            "controller rejected the configuration",
            message.clone(),
        ),
        CheckVerdict::Unsupported { reason } => {
            StepResult::skipped(StepName::RemoteVerify, format!("check unavailable: {reason}"))
        }
    };
    step.with_payload(StepPayload::Verify(verdict))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(exit_code: i32, stdout: &str, stderr: &str) -> Result<CommandOutput, TransportError> {
        Ok(CommandOutput {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        })
    }

    #[test]
    fn json_ok_is_valid() {
        let verdict = classify(output(0, r#"{"result": "ok", "data": {}}"#, ""));
        assert!(matches!(verdict, CheckVerdict::Valid { .. }));
    }

    #[test]
    fn json_error_is_invalid_with_message() {
        let verdict = classify(output(
            1,
            r#"{"result": "error", "message": "Invalid config for [automation]"}"#,
            "",
        ));
        assert_eq!(
            verdict,
            CheckVerdict::Invalid {
                message: "Invalid config for [automation]".to_string()
            }
        );
    }

    #[test]
    fn unauthorized_wins_over_exit_code() {
        let verdict = classify(output(1, "", "Error: 401 Unauthorized"));
        assert!(matches!(verdict, CheckVerdict::Unsupported { .. }));
        let verdict = classify(output(0, "UNAUTHORIZED", ""));
        assert!(matches!(verdict, CheckVerdict::Unsupported { .. }));
    }

    #[test]
    fn plain_text_success_keeps_raw_output() {
        let verdict = classify(output(0, "Command completed successfully.\n", ""));
        assert_eq!(
            verdict,
            CheckVerdict::Valid {
                detail: "Command completed successfully.".to_string()
            }
        );
    }

    #[test]
    fn plain_text_failure_is_unsupported() {
        let verdict = classify(output(127, "", "sh: ha: not found"));
        assert_eq!(
            verdict,
            CheckVerdict::Unsupported {
                reason: "sh: ha: not found".to_string()
            }
        );
    }

    #[test]
    fn transport_error_is_unsupported() {
        let verdict = classify(Err(TransportError::Timeout {
            operation: "ssh ha".to_string(),
            timeout: Duration::from_secs(120),
        }));
        assert!(matches!(verdict, CheckVerdict::Unsupported { .. }));
    }

    #[test]
    fn step_outcomes_follow_verdict() {
        assert!(verify_step(CheckVerdict::Invalid { message: "bad".into() }).is_failure());
        assert!(
            verify_step(CheckVerdict::Valid {
                detail: "ok".into()
            })
            .is_success()
        );
    }
}

//! Reload services after promotion.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::report::{StepName, StepPayload, StepResult};
use crate::controller::ControllerApi;

/// `(domain, service)` pairs, invoked in this order.
pub const RELOAD_OPERATIONS: &[(&str, &str)] = &[
    ("homeassistant", "reload_core_config"),
    ("automation", "reload"),
    ("script", "reload"),
    ("scene", "reload"),
    ("input_boolean", "reload"),
    ("input_number", "reload"),
    ("input_select", "reload"),
    ("input_text", "reload"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadError {
    pub operation: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadSummary {
    pub reloaded: Vec<String>,
    pub errors: Vec<ReloadError>,
}

impl ReloadSummary {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Invoke every reload operation; a failure never stops the next one.
pub async fn reload_all(api: &dyn ControllerApi) -> ReloadSummary {
    let mut summary = ReloadSummary::default();
    for (domain, service) in RELOAD_OPERATIONS {
        let operation = format!("{domain}.{service}");
        match api
            .call_service(domain, service, Value::Object(Default::default()))
            .await
        {
            Ok(_) => summary.reloaded.push(operation),
            Err(e) => {
                tracing::warn!(operation = %operation, error = %e, "reload failed");
                summary.errors.push(ReloadError {
                    operation,
                    message: e.to_string(),
                });
            }
        }
    }
    summary
}

pub fn reload_step(summary: ReloadSummary) -> StepResult {
    let step = if summary.success() {
        StepResult::success(
            StepName::Reload,
            format!("Reloaded {} operations", summary.reloaded.len()),
        )
    } else {
        let error = summary
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.operation, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        StepResult::failure(
            StepName::Reload,
            format!(
                "{} of {} reloads failed",
                summary.errors.len(),
                RELOAD_OPERATIONS.len()
            ),
            error,
        )
    };
    step.with_payload(StepPayload::Reload(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ApiError;
    use crate::testing::FakeController;

    #[tokio::test]
    async fn continues_past_failures() {
        let api = FakeController::new();
        api.fail_service(
            "script.reload",
            ApiError::Http {
                status: 500,
                message: "boom".to_string(),
            },
        );

        let summary = reload_all(&api).await;
        assert_eq!(api.service_calls().len(), RELOAD_OPERATIONS.len());
        assert_eq!(summary.reloaded.len(), RELOAD_OPERATIONS.len() - 1);
        assert_eq!(summary.errors[0].operation, "script.reload");
        assert!(!summary.success());

        let step = reload_step(summary);
        assert!(step.is_failure());
        assert!(step.error.unwrap().starts_with("script.reload: API error: 500"));
    }
}

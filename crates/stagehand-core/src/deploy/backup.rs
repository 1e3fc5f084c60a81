//! Backup orchestration.
//!
//! The controller starts backups asynchronously and never returns an id, so
//! the new backup is discovered by diffing the listing taken before the
//! trigger against listings polled afterwards.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{Instant, sleep};

use super::report::{StepName, StepPayload, StepResult};
use crate::config::BackupSettings;
use crate::controller::{ApiError, BackupEndpoint, BackupEntry, ControllerApi};

/// Listing sizes are reported in MiB.
const BYTES_PER_MIB: f64 = 1_048_576.0;

/// A backup discovered on the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupHandle {
    pub id: String,
    pub name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub size_bytes: Option<u64>,
}

impl From<BackupEntry> for BackupHandle {
    fn from(entry: BackupEntry) -> Self {
        let created_at = entry
            .date
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&Utc));
        let size_bytes = entry
            .size
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(|s| (s * BYTES_PER_MIB).round() as u64);

        Self {
            id: entry.id,
            name: entry.name,
            created_at,
            size_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    Created(BackupHandle),
    /// The backup was requested but the controller cannot list backups.
    Unverifiable(String),
}

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup did not complete within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("failed to trigger backup: {0}")]
    Trigger(#[source] ApiError),

    #[error("failed to list backups: {0}")]
    Listing(#[source] ApiError),
}

pub struct BackupOrchestrator<'a> {
    api: &'a dyn ControllerApi,
    settings: BackupSettings,
}

impl<'a> BackupOrchestrator<'a> {
    pub fn new(api: &'a dyn ControllerApi, settings: BackupSettings) -> Self {
        Self { api, settings }
    }

    /// Start a backup, falling back to the legacy service when the
    /// automatic one does not exist on this controller.
    pub async fn trigger(&self) -> Result<BackupEndpoint, ApiError> {
        match self.api.create_backup(BackupEndpoint::Automatic).await {
            Ok(()) => Ok(BackupEndpoint::Automatic),
            Err(e) if e.is_not_supported() => {
                tracing::info!(error = %e, "automatic backup service unavailable, using legacy service");
                self.api.create_backup(BackupEndpoint::Legacy).await?;
                Ok(BackupEndpoint::Legacy)
            }
            Err(e) => Err(e),
        }
    }

    /// Trigger a backup and wait for it to appear in the listing.
    pub async fn snapshot(&self) -> Result<BackupOutcome, BackupError> {
        let before = match self.api.list_backups().await {
            Ok(listing) => listing.into_iter().map(|e| e.id).collect::<HashSet<_>>(),
            Err(e) if e.is_not_found() => {
                self.trigger().await.map_err(BackupError::Trigger)?;
                return Ok(BackupOutcome::Unverifiable(
                    "backup requested but the listing API is not available".to_string(),
                ));
            }
            Err(e) => return Err(BackupError::Listing(e)),
        };

        let endpoint = self.trigger().await.map_err(BackupError::Trigger)?;
        tracing::info!(
            endpoint = endpoint.service(),
            existing = before.len(),
            "backup triggered, waiting for it to appear"
        );

        let start = Instant::now();
        let mut polls = 0u32;
        while start.elapsed() < self.settings.timeout {
            sleep(self.settings.poll_interval).await;
            polls += 1;

            match self.api.list_backups().await {
                Ok(listing) => {
                    if let Some(entry) = listing.into_iter().find(|e| !before.contains(&e.id)) {
                        tracing::info!(backup_id = %entry.id, polls, "backup completed");
                        return Ok(BackupOutcome::Created(entry.into()));
                    }
                    tracing::debug!(polls, "backup not listed yet");
                }
                Err(e) => tracing::warn!(error = %e, polls, "backup listing failed while polling"),
            }
        }

        Err(BackupError::Timeout(self.settings.timeout))
    }
}

/// Step result for a backup attempt.
pub fn backup_step(result: Result<BackupOutcome, BackupError>) -> StepResult {
    match result {
        Ok(BackupOutcome::Created(handle)) => {
            StepResult::success(StepName::Backup, format!("Backup created: {}", handle.id))
                .with_payload(StepPayload::Backup(handle))
        }
        Ok(BackupOutcome::Unverifiable(reason)) => StepResult::skipped(StepName::Backup, reason),
        Err(e) => StepResult::failure(StepName::Backup, "backup not confirmed", e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::report::StepOutcome;

    #[test]
    fn handle_converts_listing_units() {
        let handle = BackupHandle::from(BackupEntry {
            id: "abc123".to_string(),
            name: Some("Automatic backup".to_string()),
            date: Some("2025-01-01T03:00:00+00:00".to_string()),
            size: Some(2.0),
        });
        assert_eq!(handle.size_bytes, Some(2_097_152));
        assert_eq!(
            handle.created_at.unwrap().to_rfc3339(),
            "2025-01-01T03:00:00+00:00"
        );
    }

    #[test]
    fn unparseable_metadata_is_dropped() {
        let handle = BackupHandle::from(BackupEntry {
            id: "x".to_string(),
            name: None,
            date: Some("yesterday".to_string()),
            size: Some(-1.0),
        });
        assert_eq!(handle.created_at, None);
        assert_eq!(handle.size_bytes, None);
    }

    #[test]
    fn timeout_is_a_failed_step() {
        let step = backup_step(Err(BackupError::Timeout(Duration::from_secs(300))));
        assert!(step.is_failure());
        assert_eq!(
            step.error.as_deref(),
            Some("backup did not complete within 300s")
        );
    }

    #[test]
    fn unverifiable_is_skipped() {
        let step = backup_step(Ok(BackupOutcome::Unverifiable("no listing".to_string())));
        assert_eq!(step.outcome, StepOutcome::Skipped);
    }
}

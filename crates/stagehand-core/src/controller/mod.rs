//! Controller HTTP API surface used by the pipeline.

pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use http::HttpController;

/// API failures, kept distinct so callers can fall back on 404.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("API error: {status} - {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The endpoint does not exist on this controller version.
    pub fn is_not_supported(&self) -> bool {
        matches!(self.status(), Some(404 | 405 | 501))
    }
}

/// Which backup service to invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupEndpoint {
    /// Uses the controller's configured backup agents and retention
    Automatic,
    /// Pre-automatic service name
    Legacy,
}

impl BackupEndpoint {
    pub fn service(self) -> &'static str {
        match self {
            Self::Automatic => "create_automatic",
            Self::Legacy => "create",
        }
    }
}

/// One entry of the controller's backup listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub id: String,
    pub name: Option<String>,
    pub date: Option<String>,
    pub size: Option<f64>,
}

/// Subset of `GET /api/config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerInfo {
    pub version: Option<String>,
    pub location_name: Option<String>,
}

#[async_trait]
pub trait ControllerApi: Send + Sync {
    /// `POST /api/services/{domain}/{service}` with a JSON payload.
    async fn call_service(&self, domain: &str, service: &str, payload: Value)
    -> Result<Value, ApiError>;

    /// Ask the controller to start a backup; completion is observed by polling.
    async fn create_backup(&self, endpoint: BackupEndpoint) -> Result<(), ApiError> {
        self.call_service("backup", endpoint.service(), Value::Object(Default::default()))
            .await
            .map(|_| ())
    }

    /// `GET /api/backup/info`
    async fn list_backups(&self) -> Result<Vec<BackupEntry>, ApiError>;

    /// `GET /api/config`
    async fn get_config(&self) -> Result<ControllerInfo, ApiError>;
}

/// Decode a backup listing body.
///
/// Entries are identified by `backup_id`, or `slug` on older controllers;
/// entries carrying neither are dropped.
pub fn parse_backup_listing(body: &Value) -> Result<Vec<BackupEntry>, ApiError> {
    let items = match body.get("backups") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ApiError::Decode(format!(
                "expected 'backups' to be a list, got {}",
                other
            )));
        }
    };

    let entries = items
        .iter()
        .filter_map(|item| {
            let id = item
                .get("backup_id")
                .or_else(|| item.get("slug"))
                .and_then(Value::as_str)?;
            Some(BackupEntry {
                id: id.to_string(),
                name: item.get("name").and_then(Value::as_str).map(str::to_string),
                date: item.get("date").and_then(Value::as_str).map(str::to_string),
                size: item.get("size").and_then(Value::as_f64),
            })
        })
        .collect();
    Ok(entries)
}

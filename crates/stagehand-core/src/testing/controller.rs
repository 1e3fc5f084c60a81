use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::controller::{ApiError, BackupEntry, ControllerApi, ControllerInfo};

/// Recorded API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Service { domain: String, service: String },
    ListBackups,
    GetConfig,
}

impl ApiCall {
    /// `domain.service` for service calls.
    pub fn operation(&self) -> Option<String> {
        match self {
            Self::Service { domain, service } => Some(format!("{domain}.{service}")),
            _ => None,
        }
    }
}

struct FakeControllerState {
    calls: Vec<ApiCall>,
    listings: VecDeque<Result<Vec<BackupEntry>, ApiError>>,
    last_listing: Result<Vec<BackupEntry>, ApiError>,
    service_errors: HashMap<String, ApiError>,
    config: Result<ControllerInfo, ApiError>,
}

/// Fake controller API.
///
/// Backup listings are served in the order they were pushed; once the queue
/// is drained the last listing keeps being returned.
#[derive(Clone)]
pub struct FakeController {
    inner: Arc<Mutex<FakeControllerState>>,
}

impl Default for FakeController {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeControllerState {
                calls: Vec::new(),
                listings: VecDeque::new(),
                last_listing: Ok(Vec::new()),
                service_errors: HashMap::new(),
                config: Ok(ControllerInfo {
                    version: Some("2025.1.0".to_string()),
                    location_name: Some("Home".to_string()),
                }),
            })),
        }
    }
}

impl FakeController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a listing containing exactly `ids`.
    pub fn push_listing(&self, ids: &[&str]) {
        let entries = ids
            .iter()
            .map(|id| BackupEntry {
                id: id.to_string(),
                name: Some(format!("Backup {id}")),
                date: Some("2025-01-01T03:00:00+00:00".to_string()),
                size: Some(1.5),
            })
            .collect();
        self.inner.lock().listings.push_back(Ok(entries));
    }

    pub fn push_listing_error(&self, error: ApiError) {
        self.inner.lock().listings.push_back(Err(error));
    }

    /// Make `domain.service` fail with `error`.
    pub fn fail_service(&self, operation: &str, error: ApiError) {
        self.inner
            .lock()
            .service_errors
            .insert(operation.to_string(), error);
    }

    pub fn set_config(&self, config: Result<ControllerInfo, ApiError>) {
        self.inner.lock().config = config;
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.inner.lock().calls.clone()
    }

    /// Service operations invoked, as `domain.service`, in order.
    pub fn service_calls(&self) -> Vec<String> {
        self.calls().iter().filter_map(ApiCall::operation).collect()
    }

    pub fn listing_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == ApiCall::ListBackups)
            .count()
    }
}

#[async_trait]
impl ControllerApi for FakeController {
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        _payload: Value,
    ) -> Result<Value, ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ApiCall::Service {
            domain: domain.to_string(),
            service: service.to_string(),
        });
        match inner.service_errors.get(&format!("{domain}.{service}")) {
            Some(error) => Err(error.clone()),
            None => Ok(Value::Array(Vec::new())),
        }
    }

    async fn list_backups(&self) -> Result<Vec<BackupEntry>, ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ApiCall::ListBackups);
        if let Some(next) = inner.listings.pop_front() {
            inner.last_listing = next;
        }
        inner.last_listing.clone()
    }

    async fn get_config(&self) -> Result<ControllerInfo, ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ApiCall::GetConfig);
        inner.config.clone()
    }
}

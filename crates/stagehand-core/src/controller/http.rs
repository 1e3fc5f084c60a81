//! reqwest-backed controller client.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use url::Url;

use super::{ApiError, BackupEntry, ControllerApi, ControllerInfo, parse_backup_listing};
use crate::config::ControllerSettings;

pub struct HttpController {
    client: reqwest::Client,
    base: Url,
    timeout: std::time::Duration,
}

impl HttpController {
    pub fn new(settings: &ControllerSettings) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", settings.token))
            .context("Controller token contains invalid header characters")?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .user_agent(concat!("stagehand/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base: api_base(&settings.url)?,
            timeout: settings.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Decode(format!("invalid endpoint '{}': {}", path, e)))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await.map_err(|e| self.map_transport(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_transport(e))?;

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn map_transport(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::Transport(error.to_string())
        }
    }
}

/// `<controller>/api/`, keeping any path prefix the URL already has.
fn api_base(url: &Url) -> anyhow::Result<Url> {
    let mut root = url.clone();
    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    root.join("api/")
        .with_context(|| format!("Invalid controller URL: {}", url))
}

#[async_trait]
impl ControllerApi for HttpController {
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        payload: Value,
    ) -> Result<Value, ApiError> {
        let url = self.endpoint(&format!("services/{}/{}", domain, service))?;
        tracing::debug!(%url, "calling service");
        self.send(self.client.post(url).json(&payload)).await
    }

    async fn list_backups(&self) -> Result<Vec<BackupEntry>, ApiError> {
        let url = self.endpoint("backup/info")?;
        let body = self.send(self.client.get(url)).await?;
        parse_backup_listing(&body)
    }

    async fn get_config(&self) -> Result<ControllerInfo, ApiError> {
        let url = self.endpoint("config")?;
        let body = self.send(self.client.get(url)).await?;
        serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

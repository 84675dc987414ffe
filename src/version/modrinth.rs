//! Modrinth v2 API catalog implementation

use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS};
use crate::version::catalog::Catalog;
use crate::version::error::CatalogError;

/// Default base URL for the Modrinth API
pub const DEFAULT_BASE_URL: &str = "https://api.modrinth.com";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Catalog implementation backed by the Modrinth batch endpoints
pub struct ModrinthCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl ModrinthCatalog {
    /// Creates a new ModrinthCatalog with a custom base URL and default timeouts
    pub fn new(base_url: &str) -> Self {
        Self::with_timeouts(
            base_url,
            Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        )
    }

    pub fn with_timeouts(base_url: &str, connect_timeout: Duration, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .connect_timeout(connect_timeout)
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Builds `{base}/v2/{collection}?ids=["a","b"]`
    fn batch_url(&self, collection: &str, ids: &[String]) -> Result<Url, CatalogError> {
        let ids_param =
            serde_json::to_string(ids).map_err(|e| CatalogError::InvalidUrl(e.to_string()))?;
        let endpoint = format!("{}/v2/{}", self.base_url, collection);

        Url::parse_with_params(&endpoint, &[("ids", ids_param)])
            .map_err(|e| CatalogError::InvalidUrl(format!("{}: {}", endpoint, e)))
    }

    async fn fetch_batch(&self, collection: &str, ids: &[String]) -> Result<Vec<Value>, CatalogError> {
        let url = self.batch_url(collection, ids)?;
        debug!("Requesting {} {} from {}", ids.len(), collection, url);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(CatalogError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            warn!("Modrinth returned status {}: {}", status, url);
            return Err(CatalogError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            warn!("Failed to parse Modrinth response: {}", e);
            CatalogError::InvalidResponse(e.to_string())
        })?;

        match body {
            Value::Array(records) => Ok(records),
            other => Err(CatalogError::InvalidResponse(format!(
                "Expected a JSON array, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Default for ModrinthCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait::async_trait]
impl Catalog for ModrinthCatalog {
    async fn fetch_versions(&self, ids: &[String]) -> Result<Vec<Value>, CatalogError> {
        self.fetch_batch("versions", ids).await
    }

    async fn fetch_projects(&self, ids: &[String]) -> Result<Vec<Value>, CatalogError> {
        self.fetch_batch("projects", ids).await
    }
}

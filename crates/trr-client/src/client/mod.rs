//! TestRail client.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs,
//! page following in pagination.rs, one method per endpoint in api.rs.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::types::ClientConfig;

mod api;
mod http;
mod pagination;

use http::HttpBackend;
pub use pagination::Listing;

pub(crate) const USER_AGENT_VALUE: &str = concat!("testrail-reporter/", env!("CARGO_PKG_VERSION"));

/// Client for the TestRail API v2.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct TestRailClient {
    http: HttpBackend,
}

impl TestRailClient {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        if config.url.trim().is_empty() {
            return Err(ApiError::Config {
                message: "service URL is empty (set TESTRAIL_URL)".to_string(),
            });
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| ApiError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http: HttpBackend::new(client, config),
        })
    }

    pub fn from_env() -> ApiResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.http.config.url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.http.config
    }

    /// Raw GET against an API method, e.g. `get_case/1`.
    pub async fn send_get(&self, uri: &str) -> ApiResult<Value> {
        self.http.get(uri).await
    }

    /// Raw POST against an API method, e.g. `add_case/1`.
    pub async fn send_post(&self, uri: &str, body: Option<&Value>) -> ApiResult<Value> {
        self.http.post(uri, body).await
    }

    async fn get_as<T: DeserializeOwned>(&self, uri: &str) -> ApiResult<T> {
        decode(self.http.get(uri).await?, uri)
    }

    async fn post_as<T: DeserializeOwned>(&self, uri: &str, body: &impl Serialize) -> ApiResult<T> {
        let body = encode(body)?;
        decode(self.http.post(uri, Some(&body)).await?, uri)
    }

    async fn post_empty(&self, uri: &str) -> ApiResult<()> {
        self.http.post(uri, None).await.map(|_| ())
    }

    fn list<T>(&self, uri: String, key: &'static str) -> Listing<'_, T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        pagination::paginate(&self.http, uri, key)
    }

    async fn list_all<T>(&self, uri: String, key: &'static str) -> ApiResult<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        use futures::TryStreamExt;
        self.list(uri, key).try_collect().await
    }
}

/// Query filter appended to listing URIs (`&key=value`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    params: Vec<(String, String)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Comma-joined id list, e.g. `&status_id=1,4,5`.
    pub fn ids(self, key: impl Into<String>, ids: &[u64]) -> Self {
        let joined = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.param(key, joined)
    }

    /// Boolean flag rendered as `0`/`1`.
    pub fn flag(self, key: impl Into<String>, value: bool) -> Self {
        self.param(key, u8::from(value))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub(crate) fn apply(&self, mut uri: String) -> String {
        for (key, value) in &self.params {
            uri.push('&');
            uri.push_str(key);
            uri.push('=');
            uri.push_str(value);
        }
        uri
    }
}

fn encode(body: &impl Serialize) -> ApiResult<Value> {
    serde_json::to_value(body).map_err(|e| ApiError::InvalidResponse {
        message: format!("failed to encode request body: {}", e),
    })
}

fn decode<T: DeserializeOwned>(value: Value, uri: &str) -> ApiResult<T> {
    serde_json::from_value(value).map_err(|e| ApiError::InvalidResponse {
        message: format!("failed to parse response of {}: {}", uri, e),
    })
}

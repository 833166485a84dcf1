//! HTTP layer: auth, status mapping, the single rate-limit retry.
//!
//! This is the ONLY place for status code handling. client/mod.rs never
//! interprets status codes.

use std::sync::OnceLock;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::types::ClientConfig;

/// Added on top of the server-indicated wait so the retry lands after it.
const RETRY_MARGIN: Duration = Duration::from_secs(1);

/// HTTP backend (holds reqwest client, auth header, config).
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) api_url: String,
    pub(crate) auth_header: String,
    pub(crate) config: ClientConfig,
}

/// Body of a request.
pub(crate) enum Payload<'a> {
    Empty,
    Json(&'a Value),
}

impl HttpBackend {
    pub(crate) fn new(client: reqwest::Client, config: ClientConfig) -> Self {
        let api_url = format!("{}/index.php?/api/v2/", config.url.trim_end_matches('/'));
        let credentials = format!("{}:{}", config.user, config.password);
        let auth_header = format!("Basic {}", STANDARD.encode(credentials));
        Self {
            client,
            api_url,
            auth_header,
            config,
        }
    }

    pub(crate) fn url(&self, uri: &str) -> String {
        format!("{}{}", self.api_url, uri)
    }

    /// GET returning decoded JSON.
    pub(crate) async fn get(&self, uri: &str) -> ApiResult<Value> {
        let response = self.request(Method::GET, uri, Payload::Empty).await?;
        decode_json(response).await
    }

    /// POST returning decoded JSON (`Null` for an empty body).
    pub(crate) async fn post(&self, uri: &str, body: Option<&Value>) -> ApiResult<Value> {
        let payload = match body {
            Some(value) => Payload::Json(value),
            None => Payload::Empty,
        };
        let response = self.request(Method::POST, uri, payload).await?;
        decode_json(response).await
    }

    /// GET returning raw bytes (attachments).
    pub(crate) async fn get_bytes(&self, uri: &str) -> ApiResult<Vec<u8>> {
        let response = self.request(Method::GET, uri, Payload::Empty).await?;
        let bytes = response.bytes().await.map_err(|e| ApiError::Network {
            message: format!("failed to read response body: {}", e),
        })?;
        Ok(bytes.to_vec())
    }

    /// POST a file as multipart form field `attachment`.
    pub(crate) async fn post_file(
        &self,
        uri: &str,
        file_name: String,
        content: Vec<u8>,
    ) -> ApiResult<Value> {
        let send = || {
            let part = reqwest::multipart::Part::bytes(content.clone()).file_name(file_name.clone());
            let form = reqwest::multipart::Form::new().part("attachment", part);
            self.client
                .post(self.url(uri))
                .header(AUTHORIZATION, &self.auth_header)
                .multipart(form)
                .send()
        };

        let response = match check_status(send().await?).await {
            Err(ApiError::RateLimited { retry_after }) => {
                self.wait_rate_limit(uri, retry_after).await;
                check_status(send().await?).await?
            }
            other => other?,
        };
        decode_json(response).await
    }

    /// Make a request; a 429 answer is retried exactly once after the
    /// indicated wait, the second failure propagates.
    pub(crate) async fn request(
        &self,
        method: Method,
        uri: &str,
        payload: Payload<'_>,
    ) -> ApiResult<reqwest::Response> {
        match self.request_once(method.clone(), uri, &payload).await {
            Err(ApiError::RateLimited { retry_after }) => {
                self.wait_rate_limit(uri, retry_after).await;
                self.request_once(method, uri, &payload).await
            }
            other => other,
        }
    }

    async fn wait_rate_limit(&self, uri: &str, retry_after: Option<Duration>) {
        let base = retry_after.unwrap_or(Duration::from_secs(self.config.retry_timeout_secs));
        let wait = base + RETRY_MARGIN;
        warn!(
            uri = %uri,
            retry_after_ms = base.as_millis() as u64,
            wait_ms = wait.as_millis() as u64,
            "rate limited, retrying once"
        );
        tokio::time::sleep(wait).await;
    }

    async fn request_once(
        &self,
        method: Method,
        uri: &str,
        payload: &Payload<'_>,
    ) -> ApiResult<reqwest::Response> {
        let url = self.url(uri);
        debug!(method = %method, uri = %uri, "api request");

        let mut request = self
            .client
            .request(method, &url)
            .header(AUTHORIZATION, &self.auth_header)
            .header(CONTENT_TYPE, "application/json");

        if let Payload::Json(body) = payload {
            let bytes = serde_json::to_vec(body).map_err(|e| ApiError::InvalidResponse {
                message: format!("failed to encode request body: {}", e),
            })?;
            request = request.body(bytes);
        }

        let response = request.send().await?;
        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let header_hint = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        let retry_after = header_hint.or_else(|| parse_retry_after(&body));
        return Err(ApiError::RateLimited { retry_after });
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Service {
        status: status.as_u16(),
        message: service_message(&body, status),
    })
}

async fn decode_json(response: reqwest::Response) -> ApiResult<Value> {
    let bytes = response.bytes().await.map_err(|e| ApiError::Network {
        message: format!("failed to read response body: {}", e),
    })?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| ApiError::InvalidResponse {
        message: format!("response is not JSON: {}", e),
    })
}

/// Pull the wait out of a 429 body such as
/// `{"error": "API Rate Limit Exceeded - Retry after 12 seconds"}`.
pub(crate) fn parse_retry_after(body: &str) -> Option<Duration> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"Retry after (\d+) seconds").expect("static retry-after pattern")
    });
    pattern
        .captures(body)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// The `error` field of a JSON error body, else the raw body, else the
/// status reason.
pub(crate) fn service_message(body: &str, status: StatusCode) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(error) = json.get("error").and_then(Value::as_str) {
            return error.to_string();
        }
    }
    if body.trim().is_empty() {
        status.to_string()
    } else {
        body.chars().take(500).collect()
    }
}

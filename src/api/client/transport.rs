//! HTTP transport helpers for `/v1/messages` requests.

use crate::api::parse_retry_after_secs;
use crate::error::ApiError;
use crate::types::{MessagesRequest, MessagesResponse};
use std::time::Duration;

/// Build an HTTP client with timeout applied.
pub(super) fn build_http_client(timeout: Duration) -> reqwest::Client {
    // Fall back to reqwest defaults if builder creation fails for any reason.
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Per-request headers sent with every call.
#[derive(Debug, Clone)]
pub(super) struct RequestHeaders {
    pub(super) api_key: String,
    pub(super) version: String,
    pub(super) beta: Option<String>,
}

/// Send one `/v1/messages` request and parse the response payload.
pub(super) async fn send_messages(
    http: &reqwest::Client,
    base_url: &str,
    headers: &RequestHeaders,
    request: &MessagesRequest,
) -> Result<MessagesResponse, ApiError> {
    let url = format!("{base_url}/v1/messages");
    let mut req = http
        .post(&url)
        .header("anthropic-version", &headers.version)
        .json(request);
    if !headers.api_key.is_empty() {
        req = req.header("x-api-key", &headers.api_key);
    }
    if let Some(beta) = headers.beta.as_deref().filter(|b| !b.trim().is_empty()) {
        req = req.header("anthropic-beta", beta.trim());
    }

    let response = req.send().await?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let retry_after_secs = parse_retry_after_secs(response.headers());
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::status(status, body, retry_after_secs));
    }

    let text = response.text().await?;
    serde_json::from_str::<MessagesResponse>(&text)
        .map_err(|e| ApiError::InvalidResponse(format!("{e}; body: {}", preview(&text))))
}

fn preview(body: &str) -> String {
    crate::textutil::truncate_with_suffix_by_bytes(body, 500, "...")
}

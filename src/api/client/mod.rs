//! API client orchestration for the Messages API.
//!
//! - dispatch wiring and header handling live in `transport`.
//! - retry policy logic lives in `retry`.

mod retry;
mod transport;

use super::ModelClient;
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::types::{MessagesRequest, MessagesResponse};
use async_trait::async_trait;
use retry::RetryPolicy;
use std::time::Duration;
use tokio::time::sleep;
use transport::RequestHeaders;

/// Client for the Anthropic Messages API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    headers: RequestHeaders,
    retry_policy: RetryPolicy,
}

impl ApiClient {
    /// Build a client from API configuration.
    pub fn new(config: &ApiConfig) -> Self {
        let retry_policy = RetryPolicy::default().with_max_attempts(config.max_attempts);
        Self::new_with_retry_policy(
            config,
            Duration::from_secs(config.timeout_secs.max(1)),
            retry_policy,
        )
    }

    fn new_with_retry_policy(
        config: &ApiConfig,
        timeout: Duration,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            http: transport::build_http_client(timeout),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            headers: RequestHeaders {
                api_key: config.api_key.trim().to_string(),
                version: config.anthropic_version.clone(),
                beta: config.beta.clone(),
            },
            retry_policy,
        }
    }

    /// Send one Messages request, retrying transient failures.
    pub async fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse, ApiError> {
        let mut attempt: u32 = 0;
        loop {
            let result =
                transport::send_messages(&self.http, &self.base_url, &self.headers, request).await;
            match result {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if !self.retry_policy.should_retry(&err, attempt) {
                        return Err(err);
                    }
                    let delay = self.retry_policy.retry_delay_for(attempt, &err);
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying API request"
                    );
                    attempt = attempt.saturating_add(1);
                    sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl ModelClient for ApiClient {
    async fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse, ApiError> {
        ApiClient::send(self, request).await
    }
}

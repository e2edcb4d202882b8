//! HTTP client for the Anthropic Messages API.
//!
//! - `client`: request dispatch, auth headers and retries
//! - [`ModelClient`]: the seam the conversation loop talks to

use crate::error::ApiError;
use crate::types::{MessagesRequest, MessagesResponse};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::sync::Arc;
use std::time::SystemTime;

mod client;

pub use client::ApiClient;

/// Minimal model API interface used by the conversation loop.
///
/// Tests provide scripted responses through this trait without network
/// calls; the production path uses [`ApiClient`].
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse, ApiError>;
}

/// Shared clients (one per server, many agents).
#[async_trait]
impl<T: ModelClient + ?Sized> ModelClient for Arc<T> {
    async fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse, ApiError> {
        (**self).send(request).await
    }
}

/// Parse `Retry-After` as delta-seconds or an HTTP date.
pub(crate) fn parse_retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(secs);
    }
    let at = httpdate::parse_http_date(raw).ok()?;
    Some(
        at.duration_since(SystemTime::now())
            .map(|d| d.as_secs())
            .unwrap_or(0),
    )
}

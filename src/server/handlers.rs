// HTTP request handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::PromptServer;
use crate::agent::{is_upstream_failure, Agent};
use crate::error::AgentError;
use crate::session::SessionLog;
use crate::tools::ImagePayload;

/// Create the application router
pub fn create_router(server: Arc<PromptServer>) -> Router {
    Router::new()
        .route("/v1/prompt", post(handle_prompt))
        .route("/health", get(health_check))
        .with_state(server)
}

/// Request body for /v1/prompt
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: String,
    /// Replaces the configured system prompt suffix for this run only
    #[serde(default)]
    pub system_prompt_suffix: Option<String>,
}

/// Response body for /v1/prompt
#[derive(Debug, Serialize, Deserialize)]
pub struct PromptResponse {
    pub text: String,
    /// Base64-encoded PNGs, in the order they were taken
    pub screenshots: Vec<String>,
    pub turns: usize,
}

/// Handle POST /v1/prompt
async fn handle_prompt(
    State(server): State<Arc<PromptServer>>,
    body: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<PromptResponse>, AppError> {
    let Json(request) = body?;
    if request.prompt.trim().is_empty() {
        return Err(AppError::BadRequest("prompt must not be empty".into()));
    }

    let _run = server.run_lock.lock().await;

    let mut config = server.config.clone();
    if let Some(suffix) = request.system_prompt_suffix {
        config.agent.system_prompt_suffix = suffix;
    }

    let mut session = if config.logging.enabled {
        match SessionLog::create(&config.logging.resolved_dir()) {
            Ok(log) => Some(log),
            Err(err) => {
                tracing::warn!(error = %err, "could not open session log");
                None
            }
        }
    } else {
        None
    };
    let screenshot_dir = session
        .as_ref()
        .filter(|_| config.logging.save_screenshots)
        .map(|log| log.screenshot_dir().to_path_buf());
    if let Some(log) = session.as_mut() {
        log.record_note("source: http");
        log.record_user(&request.prompt);
    }

    let tools = (server.tools)(screenshot_dir.as_deref());
    let mut agent = Agent::with_client(&config, tools, Box::new(Arc::clone(&server.client)));

    match agent.send(&request.prompt, &mut session).await {
        Ok(report) => Ok(Json(PromptResponse {
            text: report.text,
            screenshots: report.screenshots.iter().map(ImagePayload::to_base64).collect(),
            turns: report.turns,
        })),
        Err(err) => {
            tracing::warn!(error = %err, "prompt run failed");
            if let Some(log) = session.as_mut() {
                log.record_error(&err.to_string());
            }
            Err(AppError::from(err))
        }
    }
}

/// Handle GET /health
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Error wrapper for handlers; always rendered as `{"error": "..."}`
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Upstream(String),
    Internal(String),
}

impl From<AgentError> for AppError {
    fn from(err: AgentError) -> Self {
        if is_upstream_failure(&err) {
            Self::Upstream(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

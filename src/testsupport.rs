//! Shared test fixtures.
//!
//! Temp dirs, canned model responses, a scripted model client and a recording
//! desktop, so each test module doesn't rebuild its own.

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use serde_json::Value;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::api::ModelClient;
use crate::error::{ApiError, ToolError};
use crate::tools::computer::desktop::{Desktop, InputOp};
use crate::types::{ContentBlock, MessagesRequest, MessagesResponse, Usage};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Temporary directory fixture with best-effort cleanup.
#[derive(Debug)]
pub struct TestTempDir {
    path: PathBuf,
}

impl TestTempDir {
    /// Create a unique temporary directory with a readable prefix.
    pub fn new(prefix: &str) -> Self {
        let suffix = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let dir = std::env::temp_dir().join(format!(
            "deskpilot-{prefix}-{}-{millis}-{suffix}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("failed to create temporary fixture directory");
        Self { path: dir }
    }

    /// Root directory path for this fixture.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build a child path under the fixture root.
    pub fn child(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }

    /// Write UTF-8 text to a child path, creating parent directories as needed.
    pub fn write_text(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.child(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent directories for fixture");
        }
        fs::write(&path, content).expect("failed to write fixture file");
        path
    }
}

impl Drop for TestTempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

// ---------------------------------------------------------------------------
// Canned responses
// ---------------------------------------------------------------------------

/// A response carrying the given content blocks.
pub fn response(content: Vec<ContentBlock>) -> MessagesResponse {
    MessagesResponse {
        id: "msg_test".into(),
        content,
        stop_reason: Some("end_turn".into()),
        usage: Some(Usage {
            input_tokens: 10,
            output_tokens: 5,
        }),
    }
}

/// A final text-only response.
pub fn text_response(text: &str) -> MessagesResponse {
    response(vec![ContentBlock::text(text)])
}

/// A `tool_use` block.
pub fn tool_use(id: &str, name: &str, input: Value) -> ContentBlock {
    ContentBlock::ToolUse {
        id: id.into(),
        name: name.into(),
        input,
    }
}

/// A response requesting the given tool invocations.
pub fn tool_use_response(calls: Vec<ContentBlock>) -> MessagesResponse {
    MessagesResponse {
        stop_reason: Some("tool_use".into()),
        ..response(calls)
    }
}

// ---------------------------------------------------------------------------
// Scripted model client
// ---------------------------------------------------------------------------

/// Model client that replays queued results and records every request.
pub struct ScriptedModel {
    responses: StdMutex<VecDeque<Result<MessagesResponse, ApiError>>>,
    requests: StdMutex<Vec<MessagesRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<MessagesResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(results: Vec<Result<MessagesResponse, ApiError>>) -> Self {
        Self {
            responses: StdMutex::new(results.into()),
            requests: StdMutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<MessagesRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse, ApiError> {
        self.requests.lock().expect("lock").push(request.clone());
        self.responses
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::InvalidResponse("no mock response queued".into())))
    }
}

// ---------------------------------------------------------------------------
// Recording desktop
// ---------------------------------------------------------------------------

/// Fake desktop that records input ops and returns flat-colored frames.
pub struct RecordingDesktop {
    size: (u32, u32),
    cursor: StdMutex<(i32, i32)>,
    ops: StdMutex<Vec<InputOp>>,
    captures: AtomicUsize,
}

impl RecordingDesktop {
    pub fn new(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            size: (width, height),
            cursor: StdMutex::new((0, 0)),
            ops: StdMutex::new(Vec::new()),
            captures: AtomicUsize::new(0),
        })
    }

    pub fn ops(&self) -> Vec<InputOp> {
        self.ops.lock().expect("lock").clone()
    }

    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    pub fn set_cursor(&self, x: i32, y: i32) {
        *self.cursor.lock().expect("lock") = (x, y);
    }
}

impl Desktop for RecordingDesktop {
    fn screen_size(&self) -> Result<(u32, u32), ToolError> {
        Ok(self.size)
    }

    fn perform(&self, ops: &[InputOp]) -> Result<(), ToolError> {
        for op in ops {
            if let InputOp::MoveTo { x, y } = op {
                self.set_cursor(*x, *y);
            }
        }
        self.ops.lock().expect("lock").extend_from_slice(ops);
        Ok(())
    }

    fn cursor_position(&self) -> Result<(i32, i32), ToolError> {
        Ok(*self.cursor.lock().expect("lock"))
    }

    fn capture(&self) -> Result<RgbaImage, ToolError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(RgbaImage::from_pixel(
            self.size.0,
            self.size.1,
            Rgba([20, 40, 80, 255]),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_fixture_writes_and_resolves_paths() {
        let fixture = TestTempDir::new("fixture");
        let file = fixture.write_text("nested/file.txt", "hello");
        assert_eq!(fs::read_to_string(file).unwrap(), "hello");
        assert!(fixture.path().is_dir());
    }

    #[tokio::test]
    async fn scripted_model_replays_in_order_then_errors() {
        let model = ScriptedModel::new(vec![text_response("one")]);
        let request = MessagesRequest {
            model: "m".into(),
            max_tokens: 1,
            system: String::new(),
            messages: Vec::new(),
            tools: Vec::new(),
        };
        let first = model.send(&request).await.unwrap();
        assert_eq!(first.content, vec![ContentBlock::text("one")]);
        assert!(model.send(&request).await.is_err());
        assert_eq!(model.requests().len(), 2);
    }
}

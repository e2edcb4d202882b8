//! Append-only plaintext conversation log.
//!
//! Each session writes `<root>/<YYYY-MM-DD>/<session>.log` and keeps its
//! screenshots under `<root>/<YYYY-MM-DD>/<session>/screenshots/`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::agent::LoopObserver;
use crate::error::ApiError;
use crate::textutil::truncate_with_suffix_by_bytes;
use crate::tools::ToolResult;
use crate::types::{ContentBlock, MessagesRequest, MessagesResponse};

/// Longest tool input / output excerpt written per entry.
const MAX_ENTRY_BYTES: usize = 4_000;

/// One session's log file plus its screenshot directory.
#[derive(Debug)]
pub struct SessionLog {
    id: String,
    log_path: PathBuf,
    screenshot_dir: PathBuf,
    file: File,
    write_failed: bool,
}

impl SessionLog {
    /// Start a new session under `root`, named after the current time.
    pub fn create(root: &Path) -> io::Result<Self> {
        let now = Local::now();
        let id = format!(
            "{}-{}",
            now.format("%H%M%S"),
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );
        Self::create_at(root, now, &id)
    }

    fn create_at(root: &Path, now: DateTime<Local>, id: &str) -> io::Result<Self> {
        let day_dir = root.join(now.format("%Y-%m-%d").to_string());
        fs::create_dir_all(&day_dir)?;
        let log_path = day_dir.join(format!("{id}.log"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        tracing::debug!(path = %log_path.display(), "session log opened");
        Ok(Self {
            id: id.to_string(),
            screenshot_dir: day_dir.join(id).join("screenshots"),
            log_path,
            file,
            write_failed: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Where screenshots for this session belong. Created on first use.
    pub fn screenshot_dir(&self) -> &Path {
        &self.screenshot_dir
    }

    pub fn record_user(&mut self, prompt: &str) {
        self.append("user", prompt);
    }

    pub fn record_note(&mut self, note: &str) {
        self.append("note", note);
    }

    pub fn record_error(&mut self, message: &str) {
        self.append("error", message);
    }

    fn append(&mut self, kind: &str, body: &str) {
        let stamp = Local::now().format("%H:%M:%S");
        let line = format!("[{stamp}] {kind}: {}\n", body.trim_end());
        if let Err(err) = self.file.write_all(line.as_bytes()) {
            // Logging must never break a run; complain once.
            if !self.write_failed {
                tracing::warn!(path = %self.log_path.display(), error = %err, "session log write failed");
                self.write_failed = true;
            }
        }
    }
}

impl LoopObserver for SessionLog {
    fn on_api_exchange(
        &mut self,
        _request: &MessagesRequest,
        outcome: Result<&MessagesResponse, &ApiError>,
    ) {
        if let Err(err) = outcome {
            self.record_error(&format!("API request failed: {err}"));
        }
    }

    fn on_block(&mut self, block: &ContentBlock) {
        match block {
            ContentBlock::Text { text } => self.append("assistant", text),
            ContentBlock::ToolUse { id, name, input } => {
                let input = excerpt(&input.to_string());
                self.append("tool_use", &format!("{name} ({id}) {input}"));
            }
            ContentBlock::ToolResult { .. } => {}
            ContentBlock::Other(raw) => {
                let kind = raw.get("type").and_then(|t| t.as_str()).unwrap_or("unknown");
                self.append("assistant", &format!("[{kind} block]"));
            }
        }
    }

    fn on_tool_result(&mut self, tool_use_id: &str, tool_name: &str, result: &ToolResult) {
        let body = match result {
            ToolResult::Success(output) => {
                let mut parts = Vec::new();
                if let Some(text) = output.text.as_deref().filter(|t| !t.is_empty()) {
                    parts.push(excerpt(text));
                }
                if let Some(image) = &output.image {
                    parts.push(match &image.saved_path {
                        Some(path) => format!("[screenshot {}]", path.display()),
                        None => format!("[screenshot {}x{}]", image.width, image.height),
                    });
                }
                format!("{tool_name} ({tool_use_id}) ok {}", parts.join(" "))
            }
            ToolResult::Failure(failure) => {
                format!("{tool_name} ({tool_use_id}) error {}", excerpt(&failure.message))
            }
        };
        self.append("tool_result", &body);
    }
}

fn excerpt(text: &str) -> String {
    truncate_with_suffix_by_bytes(text, MAX_ENTRY_BYTES, "...[truncated]")
}

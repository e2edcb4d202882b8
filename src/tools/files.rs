//! File read/write/edit tools.
//!
//! - `read_file`: returns numbered lines from a window of the file.
//! - `write_file`: writes content to a file, creating parents as needed.
//! - `edit_file`: replaces exactly one occurrence of a string.
//!
//! Every path goes through [`PathPolicy`] before any I/O happens.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::path_policy::PathPolicy;
use super::{parse_args, Tool, ToolOutput};
use crate::error::ToolError;
use crate::textutil::truncate_with_suffix_by_bytes;
use crate::types::ToolDefinition;

/// Default number of lines returned by `read_file`.
pub const DEFAULT_READ_LIMIT: usize = 2000;

/// Cap on the formatted `read_file` output.
const MAX_READ_BYTES: usize = 200_000;

// ---------------------------------------------------------------------------
// ReadFile
// ---------------------------------------------------------------------------

/// Tool that reads a window of lines from a file.
pub struct ReadFileTool {
    pub policy: PathPolicy,
}

#[derive(Deserialize)]
struct ReadArgs {
    #[serde(alias = "file_path")]
    path: String,
    #[serde(default)]
    offset: usize,
    #[serde(default = "default_read_limit")]
    limit: usize,
}

fn default_read_limit() -> usize {
    DEFAULT_READ_LIMIT
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().into(),
            description: "Read a text file. Returns lines prefixed with their 1-based line number and a tab.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Absolute or relative path of the file to read"
                    },
                    "offset": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Number of lines to skip before reading (default 0)"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of lines to return (default 2000)"
                    }
                },
                "required": ["path"]
            }),
        }
    }

    async fn execute(&self, input: &Value) -> Result<ToolOutput, ToolError> {
        let args: ReadArgs = parse_args(input)?;
        let path = self.policy.check(&args.path)?;
        ensure_regular_file(&path).await?;

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| io_failure(&path, e))?;
        let content = String::from_utf8_lossy(&bytes);
        let numbered = number_lines(&content, args.offset, args.limit);
        Ok(ToolOutput::text(truncate_with_suffix_by_bytes(
            &numbered,
            MAX_READ_BYTES,
            "\n...[truncated]",
        )))
    }
}

/// Format lines `offset..offset+limit` as `{n:>5}\t{line}` with 1-based numbers.
fn number_lines(content: &str, offset: usize, limit: usize) -> String {
    let mut out = String::new();
    for (idx, line) in content.split_inclusive('\n').enumerate().skip(offset).take(limit) {
        out.push_str(&format!("{:>5}\t{line}", idx + 1));
    }
    out
}

// ---------------------------------------------------------------------------
// WriteFile
// ---------------------------------------------------------------------------

/// Tool that writes content to a file.
pub struct WriteFileTool {
    pub policy: PathPolicy,
}

#[derive(Deserialize)]
struct WriteArgs {
    #[serde(alias = "file_path")]
    path: String,
    content: String,
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().into(),
            description: "Write content to a file. Creates the file and missing parent directories, overwrites an existing file.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path of the file to write"
                    },
                    "content": {
                        "type": "string",
                        "description": "Full content to write"
                    }
                },
                "required": ["path", "content"]
            }),
        }
    }

    async fn execute(&self, input: &Value) -> Result<ToolOutput, ToolError> {
        let args: WriteArgs = parse_args(input)?;
        let path = self.policy.check(&args.path)?;
        create_parent_dirs(&path).await?;
        tokio::fs::write(&path, &args.content)
            .await
            .map_err(|e| io_failure(&path, e))?;

        Ok(ToolOutput::text(format!(
            "Successfully wrote {} characters to {}",
            args.content.chars().count(),
            path.display()
        )))
    }
}

// ---------------------------------------------------------------------------
// EditFile
// ---------------------------------------------------------------------------

/// Tool that replaces one exact occurrence of a string in a file.
pub struct EditFileTool {
    pub policy: PathPolicy,
}

#[derive(Deserialize)]
struct EditArgs {
    #[serde(alias = "file_path")]
    path: String,
    old_string: String,
    new_string: String,
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &'static str {
        "edit_file"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().into(),
            description: "Replace exactly one occurrence of old_string with new_string in a file. The edit fails if old_string is missing or appears more than once. An empty old_string creates a new file containing new_string.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path of the file to edit"
                    },
                    "old_string": {
                        "type": "string",
                        "description": "Exact text to replace; must occur exactly once"
                    },
                    "new_string": {
                        "type": "string",
                        "description": "Replacement text"
                    }
                },
                "required": ["path", "old_string", "new_string"]
            }),
        }
    }

    async fn execute(&self, input: &Value) -> Result<ToolOutput, ToolError> {
        let args: EditArgs = parse_args(input)?;
        let path = self.policy.check(&args.path)?;

        if args.old_string.is_empty() {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(ToolError::InvalidArguments(format!(
                    "old_string is empty but {} already exists; use write_file to overwrite it",
                    path.display()
                )));
            }
            create_parent_dirs(&path).await?;
            tokio::fs::write(&path, &args.new_string)
                .await
                .map_err(|e| io_failure(&path, e))?;
            return Ok(ToolOutput::text(format!("Created new file {}", path.display())));
        }

        ensure_regular_file(&path).await?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| io_failure(&path, e))?;
        let occurrences = content.matches(&args.old_string).count();
        match occurrences {
            0 => {
                return Err(ToolError::NotFound(format!(
                    "old_string does not occur in {}",
                    path.display()
                )))
            }
            1 => {}
            n => {
                return Err(ToolError::Ambiguous(format!(
                    "old_string occurs {n} times in {}; include more surrounding context",
                    path.display()
                )))
            }
        }

        let updated = content.replacen(&args.old_string, &args.new_string, 1);
        tokio::fs::write(&path, updated)
            .await
            .map_err(|e| io_failure(&path, e))?;
        Ok(ToolOutput::text(format!("Successfully edited {}", path.display())))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn ensure_regular_file(path: &Path) -> Result<(), ToolError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(ToolError::ExecutionFailed(format!(
            "not a file: {}",
            path.display()
        ))),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ToolError::NotFound(format!(
            "file not found: {}",
            path.display()
        ))),
        Err(e) => Err(io_failure(path, e)),
    }
}

async fn create_parent_dirs(path: &Path) -> Result<(), ToolError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_failure(parent, e)),
        _ => Ok(()),
    }
}

fn io_failure(path: &Path, err: std::io::Error) -> ToolError {
    ToolError::ExecutionFailed(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::TestTempDir;
    use serde_json::json;
    use std::path::PathBuf;

    fn open_policy() -> PathPolicy {
        PathPolicy::new(Vec::new())
    }

    fn policy_protecting(dir: &Path) -> PathPolicy {
        PathPolicy::new(vec![dir.to_path_buf()])
    }

    fn path_arg(path: &Path) -> String {
        path.display().to_string()
    }

    #[test]
    fn tool_names() {
        assert_eq!(ReadFileTool { policy: open_policy() }.name(), "read_file");
        assert_eq!(WriteFileTool { policy: open_policy() }.name(), "write_file");
        assert_eq!(EditFileTool { policy: open_policy() }.name(), "edit_file");
    }

    #[test]
    fn number_lines_uses_absolute_line_numbers() {
        let text = "a\nb\nc\nd\n";
        assert_eq!(number_lines(text, 0, 2), "    1\ta\n    2\tb\n");
        assert_eq!(number_lines(text, 2, 10), "    3\tc\n    4\td\n");
        assert_eq!(number_lines(text, 10, 10), "");
        assert_eq!(number_lines("no newline", 0, 5), "    1\tno newline");
    }

    #[tokio::test]
    async fn read_invalid_arguments_returns_error() {
        let err = ReadFileTool { policy: open_policy() }
            .execute(&json!({"offset": 1}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid arguments"), "got: {err}");
    }

    #[tokio::test]
    async fn read_missing_file_is_not_found() {
        let fixture = TestTempDir::new("read-missing");
        let err = ReadFileTool { policy: open_policy() }
            .execute(&json!({"path": path_arg(&fixture.child("nope.txt"))}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)), "got: {err}");
    }

    #[tokio::test]
    async fn read_directory_is_rejected() {
        let fixture = TestTempDir::new("read-dir");
        let err = ReadFileTool { policy: open_policy() }
            .execute(&json!({"path": path_arg(fixture.path())}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a file"), "got: {err}");
    }

    #[tokio::test]
    async fn read_window_with_offset_and_limit() {
        let fixture = TestTempDir::new("read-window");
        let lines: String = (1..=10).map(|n| format!("line {n}\n")).collect();
        let path = fixture.write_text("f.txt", &lines);
        let out = ReadFileTool { policy: open_policy() }
            .execute(&json!({"path": path_arg(&path), "offset": 3, "limit": 2}))
            .await
            .unwrap();
        assert_eq!(out.text.as_deref(), Some("    4\tline 4\n    5\tline 5\n"));
    }

    #[tokio::test]
    async fn read_invalid_utf8_is_lossy() {
        let fixture = TestTempDir::new("read-lossy");
        let path = fixture.child("bin.txt");
        std::fs::write(&path, b"ok\xff\n").unwrap();
        let out = ReadFileTool { policy: open_policy() }
            .execute(&json!({"path": path_arg(&path)}))
            .await
            .unwrap();
        assert_eq!(out.text.as_deref(), Some("    1\tok\u{FFFD}\n"));
    }

    #[tokio::test]
    async fn write_creates_parents_and_reports_characters() {
        let fixture = TestTempDir::new("write-file");
        let path = fixture.child("nested/deeper/out.txt");
        let out = WriteFileTool { policy: open_policy() }
            .execute(&json!({"file_path": path_arg(&path), "content": "héllo"}))
            .await
            .unwrap();
        let text = out.text.unwrap();
        assert!(text.contains("wrote 5 characters"), "got: {text}");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "héllo");
    }

    #[tokio::test]
    async fn protected_paths_are_rejected_without_side_effects() {
        let fixture = TestTempDir::new("protected");
        let guarded = fixture.child("guarded");
        let existing = fixture.write_text("guarded/keep.txt", "original");
        let target = guarded.join("new.txt");

        let err = WriteFileTool { policy: policy_protecting(&guarded) }
            .execute(&json!({"path": path_arg(&target), "content": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::AccessDenied(_)), "got: {err}");
        assert!(!target.exists());

        let err = EditFileTool { policy: policy_protecting(&guarded) }
            .execute(&json!({
                "path": path_arg(&existing),
                "old_string": "original",
                "new_string": "changed"
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::AccessDenied(_)), "got: {err}");
        assert_eq!(std::fs::read_to_string(&existing).unwrap(), "original");

        let err = ReadFileTool { policy: policy_protecting(&guarded) }
            .execute(&json!({"path": path_arg(&existing)}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::AccessDenied(_)), "got: {err}");
    }

    #[tokio::test]
    async fn edit_replaces_single_occurrence() {
        let fixture = TestTempDir::new("edit-once");
        let path = fixture.write_text("cfg.ini", "mode=fast\nlevel=2\n");
        EditFileTool { policy: open_policy() }
            .execute(&json!({
                "path": path_arg(&path),
                "old_string": "mode=fast",
                "new_string": "mode=safe"
            }))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "mode=safe\nlevel=2\n");
    }

    #[tokio::test]
    async fn edit_missing_string_leaves_file_untouched() {
        let fixture = TestTempDir::new("edit-missing");
        let path = fixture.write_text("a.txt", "alpha\n");
        let err = EditFileTool { policy: open_policy() }
            .execute(&json!({
                "path": path_arg(&path),
                "old_string": "beta",
                "new_string": "gamma"
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)), "got: {err}");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "alpha\n");
    }

    #[tokio::test]
    async fn edit_ambiguous_string_reports_count() {
        let fixture = TestTempDir::new("edit-ambiguous");
        let path = fixture.write_text("a.txt", "x = 1\nx = 1\nx = 1\n");
        let err = EditFileTool { policy: open_policy() }
            .execute(&json!({
                "path": path_arg(&path),
                "old_string": "x = 1",
                "new_string": "x = 2"
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Ambiguous(_)), "got: {err}");
        assert!(err.to_string().contains("3 times"), "got: {err}");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x = 1\nx = 1\nx = 1\n");
    }

    #[tokio::test]
    async fn edit_with_empty_old_string_creates_missing_file() {
        let fixture = TestTempDir::new("edit-create");
        let path: PathBuf = fixture.child("new/dir/file.txt");
        let out = EditFileTool { policy: open_policy() }
            .execute(&json!({
                "path": path_arg(&path),
                "old_string": "",
                "new_string": "fresh"
            }))
            .await
            .unwrap();
        assert!(out.text.unwrap().starts_with("Created new file"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh");
    }

    #[tokio::test]
    async fn edit_with_empty_old_string_rejects_existing_file() {
        let fixture = TestTempDir::new("edit-exists");
        let path = fixture.write_text("keep.txt", "keep me");
        let err = EditFileTool { policy: open_policy() }
            .execute(&json!({
                "path": path_arg(&path),
                "old_string": "",
                "new_string": "clobbered"
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)), "got: {err}");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
    }
}

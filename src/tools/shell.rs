//! Shell command execution tool.
//!
//! Runs a command through PowerShell, `cmd.exe` or `sh` and returns its
//! output. Commands matching the denylist are rejected before any process
//! is spawned.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Command;

use super::{parse_args, Tool, ToolOutput};
use crate::error::ToolError;
use crate::textutil::truncate_with_suffix_by_bytes;
use crate::types::ToolDefinition;

/// Maximum bytes of stdout/stderr returned to the model, per stream.
const MAX_OUTPUT_LEN: usize = 16_000;

/// `CREATE_NO_WINDOW`: keep console windows from flashing on the desktop.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Which interpreter runs the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellKind {
    /// `powershell.exe -NoProfile -Command`
    Powershell,
    /// `cmd.exe /C`
    Cmd,
    /// `sh -c`
    Sh,
}

impl ShellKind {
    /// PowerShell on Windows, `sh` elsewhere.
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Self::Powershell
        } else {
            Self::Sh
        }
    }

    fn command_line(self, command: &str) -> (&'static str, Vec<&str>) {
        match self {
            Self::Powershell => ("powershell.exe", vec!["-NoProfile", "-Command", command]),
            Self::Cmd => ("cmd.exe", vec!["/C", command]),
            Self::Sh => ("sh", vec!["-c", command]),
        }
    }
}

/// Tool that runs shell commands and returns their output.
pub struct ShellTool {
    pub shell: ShellKind,
    /// Case-insensitive substrings that block a command.
    pub denylist: Vec<String>,
    /// Limit used when the model doesn't pass `timeout`.
    pub default_timeout: Duration,
}

#[derive(Deserialize)]
struct Args {
    command: String,
    timeout: Option<f64>,
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn definition(&self) -> ToolDefinition {
        let shell = match self.shell {
            ShellKind::Powershell => "Windows PowerShell",
            ShellKind::Cmd => "the Windows command prompt (cmd.exe)",
            ShellKind::Sh => "the POSIX shell",
        };
        ToolDefinition {
            name: self.name().into(),
            description: format!(
                "Run a command in {shell} and return its output. Destructive disk and registry commands are blocked. Commands are killed when they exceed the timeout (default {} seconds).",
                self.default_timeout.as_secs()
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The command to execute"
                    },
                    "timeout": {
                        "type": "number",
                        "exclusiveMinimum": 0,
                        "description": "Timeout in seconds"
                    }
                },
                "required": ["command"]
            }),
        }
    }

    async fn execute(&self, input: &Value) -> Result<ToolOutput, ToolError> {
        let args: Args = parse_args(input)?;
        if args.command.trim().is_empty() {
            return Err(ToolError::InvalidArguments("command cannot be empty".into()));
        }
        if let Some(pattern) = matched_denylist_pattern(&args.command, &self.denylist) {
            tracing::warn!(pattern = %pattern, "blocked shell command");
            return Err(ToolError::Blocked(format!(
                "command matches denylist pattern `{pattern}`"
            )));
        }
        let limit = match args.timeout {
            None => self.default_timeout,
            Some(secs) if secs > 0.0 => Duration::try_from_secs_f64(secs).map_err(|_| {
                ToolError::InvalidArguments(format!("timeout of {secs} seconds is out of range"))
            })?,
            Some(_) => {
                return Err(ToolError::InvalidArguments(
                    "timeout must be a positive number of seconds".into(),
                ))
            }
        };

        let output = run_command(self.shell, &args.command, limit).await?;
        let stdout = truncate_output(&output.stdout);
        let stderr = truncate_output(&output.stderr);
        if output.exit_code != 0 {
            return Err(ToolError::CommandFailed {
                exit_code: output.exit_code,
                stderr,
                stdout,
            });
        }

        let mut text = stdout;
        if !stderr.trim().is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str("stderr:\n");
            text.push_str(&stderr);
        }
        Ok(ToolOutput::text(text))
    }
}

/// Captured process output.
#[derive(Debug)]
struct ExecOutput {
    exit_code: i32,
    stdout: String,
    stderr: String,
}

/// Spawn the command and wait up to `limit` for it to finish.
async fn run_command(shell: ShellKind, command: &str, limit: Duration) -> Result<ExecOutput, ToolError> {
    let (program, args) = shell.command_line(command);
    let mut cmd = Command::new(program);
    // Dropping the wait future on timeout kills the child.
    cmd.kill_on_drop(true);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    tracing::debug!(program, timeout_secs = limit.as_secs_f64(), "spawning shell command");
    let child = cmd
        .spawn()
        .map_err(|e| ToolError::ExecutionFailed(format!("failed to start {program}: {e}")))?;

    let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(result) => {
            result.map_err(|e| ToolError::ExecutionFailed(format!("{program}: {e}")))?
        }
        Err(_) => {
            tracing::warn!(program, "shell command timed out");
            return Err(ToolError::TimedOut(limit));
        }
    };

    Ok(ExecOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn truncate_output(s: &str) -> String {
    truncate_with_suffix_by_bytes(s, MAX_OUTPUT_LEN, "...[truncated]")
}

fn matched_denylist_pattern(command: &str, denylist: &[String]) -> Option<String> {
    let lowered = command.to_lowercase();
    denylist
        .iter()
        .map(|pattern| pattern.trim())
        .filter(|pattern| !pattern.is_empty())
        .find(|pattern| lowered.contains(&pattern.to_lowercase()))
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_shell_denylist;
    use serde_json::json;

    fn tool() -> ShellTool {
        ShellTool {
            shell: ShellKind::platform_default(),
            denylist: default_shell_denylist(),
            default_timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn name_is_shell() {
        assert_eq!(tool().name(), "shell");
    }

    #[test]
    fn truncate_long_output_adds_marker() {
        let long = "x".repeat(MAX_OUTPUT_LEN + 10);
        assert!(truncate_output(&long).ends_with("...[truncated]"));
        assert_eq!(truncate_output("short"), "short");
    }

    #[test]
    fn denylist_matches_case_insensitively() {
        let denylist = default_shell_denylist();
        assert_eq!(
            matched_denylist_pattern("FORMAT C: /q", &denylist).as_deref(),
            Some("format")
        );
        assert_eq!(
            matched_denylist_pattern("Reg Delete HKCU\\Software\\X", &denylist).as_deref(),
            Some("reg delete")
        );
        assert!(matched_denylist_pattern("Get-ChildItem C:\\Users", &denylist).is_none());
    }

    #[test]
    fn blank_denylist_entries_are_ignored() {
        let denylist = vec!["  ".to_string(), String::new()];
        assert!(matched_denylist_pattern("anything", &denylist).is_none());
    }

    #[test]
    fn shell_kinds_build_expected_command_lines() {
        assert_eq!(
            ShellKind::Powershell.command_line("dir"),
            ("powershell.exe", vec!["-NoProfile", "-Command", "dir"])
        );
        assert_eq!(ShellKind::Cmd.command_line("dir"), ("cmd.exe", vec!["/C", "dir"]));
        assert_eq!(ShellKind::Sh.command_line("ls"), ("sh", vec!["-c", "ls"]));
    }

    #[tokio::test]
    async fn blocked_command_never_spawns() {
        // The marker file would only appear if the command actually ran.
        let fixture = crate::testsupport::TestTempDir::new("shell-blocked");
        let marker = fixture.child("ran");
        let command = format!("echo diskpart > {}", marker.display());
        let err = tool().execute(&json!({ "command": command })).await.unwrap_err();
        assert!(matches!(err, ToolError::Blocked(_)), "got: {err}");
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn empty_command_is_invalid() {
        let err = tool().execute(&json!({"command": "   "})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)), "got: {err}");
    }

    #[tokio::test]
    async fn non_positive_timeout_is_invalid() {
        let err = tool()
            .execute(&json!({"command": "echo hi", "timeout": 0}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timeout"), "got: {err}");
    }

    #[tokio::test]
    async fn huge_timeout_is_invalid_not_a_panic() {
        let err = tool()
            .execute(&json!({"command": "echo hi", "timeout": 1e30}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)), "got: {err}");
        assert!(err.to_string().contains("out of range"), "got: {err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn echo_returns_stdout() {
        let out = tool().execute(&json!({"command": "echo hello"})).await.unwrap();
        assert_eq!(out.text.as_deref(), Some("hello\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stderr_is_appended_on_success() {
        let out = tool()
            .execute(&json!({"command": "echo out; echo warn >&2"}))
            .await
            .unwrap();
        assert_eq!(out.text.as_deref(), Some("out\nstderr:\nwarn\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_command_failed() {
        let err = tool()
            .execute(&json!({"command": "echo partial; echo broken >&2; exit 42"}))
            .await
            .unwrap_err();
        match &err {
            ToolError::CommandFailed {
                exit_code,
                stderr,
                stdout,
            } => {
                assert_eq!(*exit_code, 42);
                assert_eq!(stderr, "broken\n");
                assert_eq!(stdout, "partial\n");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
        assert!(err.to_string().contains("exit code 42: broken"), "got: {err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_times_out() {
        let started = std::time::Instant::now();
        let err = tool()
            .execute(&json!({"command": "sleep 5", "timeout": 0.2}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::TimedOut(_)), "got: {err}");
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}

//! Terminal output for the REPL and one-shot modes.
//!
//! Assistant text goes to stdout; tool activity, API traces and diagnostics go
//! to stderr so stdout stays pipeable.

use std::io::{self, Write};

use crossterm::style::{Color, Stylize};
use termimad::MadSkin;

use crate::agent::LoopObserver;
use crate::config::DisplayConfig;
use crate::error::ApiError;
use crate::textutil::one_line_preview;
use crate::tools::ToolResult;
use crate::types::{ContentBlock, MessagesRequest, MessagesResponse};

const INDENT: &str = "  ";
const TOOL_ARGS_PREVIEW_CHARS: usize = 100;
const TOOL_RESULT_PREVIEW_CHARS: usize = 160;

/// Handles all terminal output formatting.
pub struct Renderer {
    color: bool,
    hide_images: bool,
    show_http: bool,
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
}

impl Renderer {
    /// Renderer writing to the process's stdout and stderr.
    pub fn new(display: &DisplayConfig) -> Self {
        Self::with_writers(display, Box::new(io::stdout()), Box::new(io::stderr()))
    }

    pub fn with_writers(
        display: &DisplayConfig,
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            color: display.color,
            hide_images: display.hide_images,
            show_http: display.show_http,
            out,
            err,
        }
    }

    /// Print the model/session header.
    pub fn header(&mut self, model: &str, detail: &str) {
        let line = if self.color {
            format!(
                "{} {} {}",
                "deskpilot".with(Color::Cyan).bold(),
                model.with(Color::Blue),
                detail.with(Color::DarkGrey)
            )
        } else {
            format!("deskpilot {model} {detail}")
        };
        self.line_err(&line);
    }

    /// Print the REPL input indicator.
    pub fn prompt(&mut self) {
        let symbol = if self.color {
            format!("{} ", ">".with(Color::Cyan).bold())
        } else {
            "> ".to_string()
        };
        let _ = write!(self.err, "{symbol}");
        let _ = self.err.flush();
    }

    /// Print assistant text as terminal-formatted markdown.
    pub fn assistant_text(&mut self, text: &str) {
        let rendered = MadSkin::no_style().text(text, None).to_string();
        let _ = writeln!(self.out, "{}", rendered.trim_end_matches('\n'));
        let _ = self.out.flush();
    }

    pub fn tool_call(&mut self, name: &str, input: &serde_json::Value) {
        let preview = one_line_preview(&input.to_string(), TOOL_ARGS_PREVIEW_CHARS);
        let line = if self.color {
            format!(
                "{INDENT}{} {}{}",
                "▸".with(Color::Yellow),
                name.with(Color::Yellow).bold(),
                format!("({preview})").with(Color::DarkGrey)
            )
        } else {
            format!("{INDENT}> {name}({preview})")
        };
        self.line_err(&line);
    }

    pub fn tool_result(&mut self, result: &ToolResult) {
        match result {
            ToolResult::Success(output) => {
                if let Some(text) = output.text.as_deref().filter(|t| !t.trim().is_empty()) {
                    let preview = one_line_preview(text, TOOL_RESULT_PREVIEW_CHARS);
                    let line = if self.color {
                        format!("{INDENT}{} {preview}", "✓".with(Color::Green))
                    } else {
                        format!("{INDENT}ok {preview}")
                    };
                    self.line_err(&line);
                }
                if let Some(image) = output.image.as_ref().filter(|_| !self.hide_images) {
                    let mut notice = format!("screenshot {}x{}", image.width, image.height);
                    if let Some(path) = &image.saved_path {
                        notice.push_str(&format!(" saved to {}", path.display()));
                    }
                    let line = if self.color {
                        format!("{INDENT}{} {}", "◻".with(Color::Green), notice.with(Color::DarkGrey))
                    } else {
                        format!("{INDENT}ok {notice}")
                    };
                    self.line_err(&line);
                }
            }
            ToolResult::Failure(failure) => {
                let message = one_line_preview(&failure.message, TOOL_RESULT_PREVIEW_CHARS);
                let line = if self.color {
                    format!("{INDENT}{}", format!("✗ {message}").with(Color::Red).bold())
                } else {
                    format!("{INDENT}error: {message}")
                };
                self.line_err(&line);
                if let Some(partial) = failure.partial_output.as_deref() {
                    let preview = one_line_preview(partial, TOOL_RESULT_PREVIEW_CHARS);
                    let line = if self.color {
                        format!("{INDENT}{INDENT}{}", preview.with(Color::DarkGrey))
                    } else {
                        format!("{INDENT}{INDENT}output: {preview}")
                    };
                    self.line_err(&line);
                }
            }
        }
    }

    pub fn warn(&mut self, msg: &str) {
        let line = if self.color {
            format!("{} {msg}", "warning:".with(Color::Yellow).bold())
        } else {
            format!("warning: {msg}")
        };
        self.line_err(&line);
    }

    pub fn error(&mut self, msg: &str) {
        let line = if self.color {
            format!("{} {msg}", "error:".with(Color::Red).bold())
        } else {
            format!("error: {msg}")
        };
        self.line_err(&line);
    }

    /// Print a dim informational line.
    pub fn info(&mut self, msg: &str) {
        let line = if self.color {
            msg.with(Color::DarkGrey).to_string()
        } else {
            msg.to_string()
        };
        self.line_err(&line);
    }

    fn line_err(&mut self, line: &str) {
        let _ = writeln!(self.err, "{line}");
        let _ = self.err.flush();
    }
}

impl LoopObserver for Renderer {
    fn on_api_exchange(
        &mut self,
        request: &MessagesRequest,
        outcome: Result<&MessagesResponse, &ApiError>,
    ) {
        if !self.show_http {
            return;
        }
        self.info(&format!(
            "{INDENT}→ POST /v1/messages model={} messages={} tools={}",
            request.model,
            request.messages.len(),
            request.tools.len()
        ));
        match outcome {
            Ok(response) => {
                let usage = response.usage.unwrap_or_default();
                self.info(&format!(
                    "{INDENT}← {} stop={} in={} out={}",
                    if response.id.is_empty() { "ok" } else { response.id.as_str() },
                    response.stop_reason.as_deref().unwrap_or("-"),
                    usage.input_tokens,
                    usage.output_tokens
                ));
            }
            Err(err) => {
                let message = one_line_preview(&err.to_string(), TOOL_RESULT_PREVIEW_CHARS);
                let line = if self.color {
                    format!("{INDENT}{}", format!("← {message}").with(Color::Red))
                } else {
                    format!("{INDENT}<- {message}")
                };
                self.line_err(&line);
            }
        }
    }

    fn on_block(&mut self, block: &ContentBlock) {
        match block {
            ContentBlock::Text { text } => self.assistant_text(text),
            ContentBlock::ToolUse { name, input, .. } => self.tool_call(name, input),
            ContentBlock::ToolResult { .. } | ContentBlock::Other(_) => {}
        }
    }

    fn on_tool_result(&mut self, _tool_use_id: &str, _tool_name: &str, result: &ToolResult) {
        self.tool_result(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ImagePayload, ToolFailure, ToolOutput};
    use crate::types::Usage;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Buffer {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn renderer(display: DisplayConfig) -> (Renderer, Buffer, Buffer) {
        let out = Buffer::default();
        let err = Buffer::default();
        let r = Renderer::with_writers(&display, Box::new(out.clone()), Box::new(err.clone()));
        (r, out, err)
    }

    fn plain() -> DisplayConfig {
        DisplayConfig {
            color: false,
            ..DisplayConfig::default()
        }
    }

    fn screenshot() -> ToolResult {
        ToolResult::Success(ToolOutput::image(ImagePayload {
            png: Vec::new(),
            width: 1920,
            height: 1080,
            saved_path: None,
        }))
    }

    #[test]
    fn assistant_text_goes_to_stdout_and_tools_to_stderr() {
        let (mut r, out, err) = renderer(plain());
        r.on_block(&ContentBlock::text("All done."));
        r.on_block(&ContentBlock::ToolUse {
            id: "t1".into(),
            name: "shell".into(),
            input: json!({"command": "dir"}),
        });
        assert!(out.text().contains("All done."));
        assert!(!err.text().contains("All done."));
        assert!(err.text().contains(r#"> shell({"command":"dir"})"#), "got: {}", err.text());
    }

    #[test]
    fn failures_are_red_and_distinct_from_success() {
        let (mut r, _out, err) = renderer(DisplayConfig::default());
        r.tool_result(&ToolResult::Success(ToolOutput::text("fine")));
        r.tool_result(&ToolResult::Failure(ToolFailure {
            message: "command failed with exit code 1".into(),
            partial_output: Some("half".into()),
        }));
        let text = err.text();
        let failure_line = text
            .lines()
            .find(|l| l.contains("exit code 1"))
            .expect("failure line");
        assert!(failure_line.contains("\u{1b}["), "expected ANSI styling: {failure_line:?}");
        let success_line = text.lines().find(|l| l.contains("fine")).expect("success line");
        assert!(!success_line.contains("exit code"));
        assert!(text.contains("half"));
    }

    #[test]
    fn plain_mode_labels_failures_without_escape_codes() {
        let (mut r, _out, err) = renderer(plain());
        r.tool_result(&ToolResult::failure("access denied: C:\\Windows"));
        assert_eq!(err.text(), "  error: access denied: C:\\Windows\n");
    }

    #[test]
    fn hide_images_suppresses_screenshot_notices() {
        let (mut r, _out, err) = renderer(plain());
        r.tool_result(&screenshot());
        assert!(err.text().contains("screenshot 1920x1080"));

        let (mut r, _out, err) = renderer(DisplayConfig {
            hide_images: true,
            ..plain()
        });
        r.tool_result(&screenshot());
        assert!(err.text().is_empty());
    }

    #[test]
    fn http_trace_only_when_enabled() {
        let request = MessagesRequest {
            model: "m".into(),
            max_tokens: 1,
            system: String::new(),
            messages: Vec::new(),
            tools: Vec::new(),
        };
        let response = MessagesResponse {
            id: "msg_9".into(),
            content: Vec::new(),
            stop_reason: Some("end_turn".into()),
            usage: Some(Usage {
                input_tokens: 12,
                output_tokens: 3,
            }),
        };

        let (mut r, _out, err) = renderer(plain());
        r.on_api_exchange(&request, Ok(&response));
        assert!(err.text().is_empty());

        let (mut r, _out, err) = renderer(DisplayConfig {
            show_http: true,
            ..plain()
        });
        r.on_api_exchange(&request, Ok(&response));
        r.on_api_exchange(&request, Err(&ApiError::status(401, "bad key".into(), None)));
        let text = err.text();
        assert!(text.contains("POST /v1/messages model=m"));
        assert!(text.contains("msg_9 stop=end_turn in=12 out=3"));
        assert!(text.contains("<- status 401: bad key"));
    }
}

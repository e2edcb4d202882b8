//! Pluggable tool system.
//!
//! Tools are async trait objects that the model can invoke during the
//! conversation loop. Each tool provides its own schema and an async execute
//! method taking the JSON input object of a `tool_use` block.

pub mod computer;
pub mod files;
pub mod path_policy;
pub mod shell;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Config;
use crate::error::ToolError;
use crate::types::{ContentBlock, ImageSource, ToolDefinition, ToolResultContent, ToolResultPart};

// ---------------------------------------------------------------------------
// Tool trait
// ---------------------------------------------------------------------------

/// A tool that can be invoked by the AI model.
///
/// Register instances with [`ToolRegistry`] before starting a conversation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name matching what the model will call.
    fn name(&self) -> &'static str;

    /// Tool definition for inclusion in API requests.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given JSON input object.
    async fn execute(&self, input: &Value) -> Result<ToolOutput, ToolError>;
}

// ---------------------------------------------------------------------------
// Tool output / result
// ---------------------------------------------------------------------------

/// Successful tool output: optional text plus an optional screenshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub text: Option<String>,
    pub image: Option<ImagePayload>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn image(image: ImagePayload) -> Self {
        Self {
            text: None,
            image: Some(image),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// PNG-encoded screenshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Where the screenshot was written, when a screenshot dir is configured.
    pub saved_path: Option<PathBuf>,
}

impl ImagePayload {
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.png)
    }
}

/// Failure details kept for observers. Only `message` reaches the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolFailure {
    pub message: String,
    pub partial_output: Option<String>,
}

impl From<ToolError> for ToolFailure {
    fn from(err: ToolError) -> Self {
        Self {
            partial_output: err.partial_output().map(str::to_string),
            message: err.to_string(),
        }
    }
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success(ToolOutput),
    Failure(ToolFailure),
}

impl ToolResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(ToolFailure {
            message: message.into(),
            partial_output: None,
        })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Build the `tool_result` block answering invocation `tool_use_id`.
    ///
    /// Failures carry their message only; successes carry text and image parts.
    pub fn to_content_block(&self, tool_use_id: &str) -> ContentBlock {
        match self {
            Self::Failure(failure) => ContentBlock::ToolResult {
                tool_use_id: tool_use_id.to_string(),
                content: ToolResultContent::Text(failure.message.clone()),
                is_error: true,
            },
            Self::Success(output) => {
                let mut parts = Vec::new();
                if let Some(text) = output.text.as_ref().filter(|t| !t.is_empty()) {
                    parts.push(ToolResultPart::Text { text: text.clone() });
                }
                if let Some(image) = &output.image {
                    parts.push(ToolResultPart::Image {
                        source: ImageSource::png_base64(image.to_base64()),
                    });
                }
                ContentBlock::ToolResult {
                    tool_use_id: tool_use_id.to_string(),
                    content: ToolResultContent::Parts(parts),
                    is_error: false,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tool registry
// ---------------------------------------------------------------------------

/// Registry of available tools.
///
/// The loop sends all registered definitions to the API and dispatches
/// tool invocations through this registry.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. A tool with the same name replaces the earlier one in place.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let tool: Arc<dyn Tool> = Arc::new(tool);
        match self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            Some(slot) => {
                tracing::warn!(tool = tool.name(), "replacing previously registered tool");
                *slot = tool;
            }
            None => self.tools.push(tool),
        }
    }

    /// Get tool definitions for the API request, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Registered tool names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Find a tool by name and run it.
    ///
    /// Never fails: unknown names, tool errors and panics all come back as
    /// [`ToolResult::Failure`].
    pub async fn dispatch(&self, name: &str, input: &Value) -> ToolResult {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name).cloned() else {
            tracing::warn!(tool = name, "model requested unknown tool");
            return ToolResult::failure(format!("unknown tool: {name}"));
        };

        tracing::debug!(tool = name, "dispatching tool");
        let input = input.clone();
        let handle = tokio::spawn(async move { tool.execute(&input).await });
        match handle.await {
            Ok(Ok(output)) => ToolResult::Success(output),
            Ok(Err(err)) => {
                tracing::debug!(tool = name, error = %err, "tool returned an error");
                ToolResult::Failure(err.into())
            }
            Err(join_err) => {
                tracing::error!(tool = name, error = %join_err, "tool task aborted");
                if join_err.is_panic() {
                    ToolResult::failure(format!("tool {name} panicked during execution"))
                } else {
                    ToolResult::failure(format!("tool {name} was cancelled"))
                }
            }
        }
    }

    /// True if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Register the built-in tools enabled in `config`.
///
/// `desktop` is `None` when screen automation is unavailable; the computer
/// tool is left out then. Screenshots are also written under
/// `screenshot_dir` when one is given.
pub fn builtin_registry(
    config: &Config,
    desktop: Option<Arc<dyn computer::desktop::Desktop>>,
    screenshot_dir: Option<&Path>,
) -> ToolRegistry {
    let tools = &config.tools;
    let mut registry = ToolRegistry::new();

    if tools.computer_enabled {
        if let Some(desktop) = desktop {
            let mut tool = computer::ComputerTool::new(desktop, &config.computer);
            if let Some(dir) = screenshot_dir {
                tool = tool.with_screenshot_dir(dir);
            }
            registry.register(tool);
        }
    }
    if tools.shell_enabled {
        registry.register(shell::ShellTool {
            shell: tools.shell.unwrap_or_else(shell::ShellKind::platform_default),
            denylist: tools.shell_denylist.clone(),
            default_timeout: Duration::from_secs(tools.shell_timeout_secs),
        });
    }
    if tools.files_enabled {
        let policy = path_policy::PathPolicy::from_config(tools.protected_paths.as_deref());
        registry.register(files::ReadFileTool {
            policy: policy.clone(),
        });
        registry.register(files::WriteFileTool {
            policy: policy.clone(),
        });
        registry.register(files::EditFileTool { policy });
    }
    registry
}

/// Deserialize a tool input object into the tool's argument struct.
pub(crate) fn parse_args<T: DeserializeOwned>(input: &Value) -> Result<T, ToolError> {
    T::deserialize(input).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

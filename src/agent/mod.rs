//! Core agentic loop.
//!
//! [`ConversationLoop`] runs one request/dispatch/respond cycle over a history
//! it owns for the duration of the run. [`Agent`] keeps the history between
//! prompts so an interactive session can continue where it left off.

use crate::api::{ApiClient, ModelClient};
use crate::config::Config;
use crate::error::{AgentError, ApiError};
use crate::prompt::render_system_prompt;
use crate::tools::{ImagePayload, ToolRegistry, ToolResult};
use crate::types::{Message, Role};

mod conversation;
mod observer;

pub use conversation::{ConversationLoop, LoopOutcome, LoopSettings, LoopState, Termination};
pub use observer::LoopObserver;

/// What one prompt produced.
#[derive(Debug, Clone, Default)]
pub struct TurnReport {
    /// Text of the final assistant message.
    pub text: String,
    /// Screenshots returned by tools during the run, in order.
    pub screenshots: Vec<ImagePayload>,
    /// Model requests sent.
    pub turns: usize,
}

/// Session-level wrapper: owns the client, tools and history.
pub struct Agent {
    client: Box<dyn ModelClient>,
    tools: ToolRegistry,
    settings: LoopSettings,
    messages: Vec<Message>,
}

impl Agent {
    /// Create an agent talking to the configured API.
    pub fn new(config: &Config, tools: ToolRegistry) -> Self {
        Self::with_client(config, tools, Box::new(ApiClient::new(&config.api)))
    }

    /// Create an agent with a custom model client (tests, alternate transports).
    pub fn with_client(config: &Config, tools: ToolRegistry, client: Box<dyn ModelClient>) -> Self {
        Self {
            client,
            tools,
            settings: LoopSettings {
                model: config.api.model.clone(),
                max_tokens: config.api.max_tokens,
                system: render_system_prompt(&config.agent.system_prompt_suffix),
                max_turns: config.agent.max_turns,
            },
            messages: Vec::new(),
        }
    }

    /// Send one user prompt and run the loop until the model stops calling tools.
    pub async fn send(
        &mut self,
        prompt: &str,
        observer: &mut dyn LoopObserver,
    ) -> Result<TurnReport, AgentError> {
        let previous_len = self.messages.len();
        let mut history = std::mem::take(&mut self.messages);
        history.push(Message::user_text(prompt));

        let mut screenshots = ScreenshotCollector::default();
        let outcome = {
            let mut observers = (&mut screenshots, observer);
            ConversationLoop::new(self.client.as_ref(), &self.tools, &self.settings)
                .run(history, &mut observers)
                .await
        };

        let LoopOutcome {
            mut history,
            turns,
            termination,
        } = outcome;
        match termination {
            Termination::Done => {
                let text = history.last().map(Message::text).unwrap_or_default();
                // The API rejects an assistant turn with no content on replay.
                if history
                    .last()
                    .is_some_and(|m| m.role == Role::Assistant && m.content.is_empty())
                {
                    history.pop();
                }
                self.messages = history;
                Ok(TurnReport {
                    text,
                    screenshots: screenshots.0,
                    turns,
                })
            }
            Termination::Failed(err) => {
                // Nothing was answered: drop the prompt so a retry starts clean.
                if history.len() == previous_len + 1 {
                    history.truncate(previous_len);
                }
                self.messages = history;
                Err(AgentError::Api(err))
            }
            Termination::TurnLimit => {
                self.messages = history;
                Err(AgentError::TurnLimitReached(turns))
            }
        }
    }

    /// Forget the conversation so far.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// Current conversation history.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn system_prompt(&self) -> &str {
        &self.settings.system
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.names()
    }
}

#[derive(Default)]
struct ScreenshotCollector(Vec<ImagePayload>);

impl LoopObserver for ScreenshotCollector {
    fn on_tool_result(&mut self, _tool_use_id: &str, _tool_name: &str, result: &ToolResult) {
        if let ToolResult::Success(output) = result {
            if let Some(image) = &output.image {
                self.0.push(image.clone());
            }
        }
    }
}

/// True when the error came from the upstream API rather than local setup.
pub fn is_upstream_failure(err: &AgentError) -> bool {
    matches!(err, AgentError::Api(ApiError::Http(_) | ApiError::Status { .. }))
}

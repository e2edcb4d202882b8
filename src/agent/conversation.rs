//! The request / dispatch / respond cycle.
//!
//! One run starts from a history, asks the model for the next turn, executes
//! every tool invocation it returns and feeds the results back, until a turn
//! arrives with no invocations. Upstream failures end the run; tool failures
//! never do, they are handed back to the model as error results.

use super::LoopObserver;
use crate::api::ModelClient;
use crate::error::ApiError;
use crate::tools::ToolRegistry;
use crate::types::{Message, MessagesRequest};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingModel,
    DispatchingTools,
    /// Terminal: the model answered without tool invocations.
    Done,
    /// Terminal: the upstream API call failed.
    Failed,
    /// Terminal: the configured turn cap was hit.
    TurnLimit,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::TurnLimit)
    }
}

/// Request parameters that stay fixed for a whole run.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    /// Cap on model requests per run. Unlimited when `None`.
    pub max_turns: Option<usize>,
}

/// Why a run stopped.
#[derive(Debug)]
pub enum Termination {
    Done,
    Failed(ApiError),
    TurnLimit,
}

/// Result of one run: the final history plus how it ended.
#[derive(Debug)]
pub struct LoopOutcome {
    pub history: Vec<Message>,
    /// Model requests sent during the run.
    pub turns: usize,
    pub termination: Termination,
}

impl LoopOutcome {
    pub fn state(&self) -> LoopState {
        match self.termination {
            Termination::Done => LoopState::Done,
            Termination::Failed(_) => LoopState::Failed,
            Termination::TurnLimit => LoopState::TurnLimit,
        }
    }
}

/// Drives one run against a model client and a tool registry.
pub struct ConversationLoop<'a> {
    client: &'a dyn ModelClient,
    tools: &'a ToolRegistry,
    settings: &'a LoopSettings,
}

impl<'a> ConversationLoop<'a> {
    pub fn new(
        client: &'a dyn ModelClient,
        tools: &'a ToolRegistry,
        settings: &'a LoopSettings,
    ) -> Self {
        Self {
            client,
            tools,
            settings,
        }
    }

    /// Run until a terminal state. Never panics; upstream errors come back
    /// in [`Termination::Failed`] together with the history so far.
    pub async fn run(
        &self,
        mut history: Vec<Message>,
        observer: &mut dyn LoopObserver,
    ) -> LoopOutcome {
        let definitions = self.tools.definitions();
        let mut turns = 0usize;

        loop {
            if self.settings.max_turns.is_some_and(|max| turns >= max) {
                tracing::warn!(turns, "conversation hit the turn limit");
                return finish(history, turns, Termination::TurnLimit, observer);
            }

            enter(LoopState::AwaitingModel, observer);
            let request = MessagesRequest {
                model: self.settings.model.clone(),
                max_tokens: self.settings.max_tokens,
                system: self.settings.system.clone(),
                messages: history.clone(),
                tools: definitions.clone(),
            };
            turns += 1;

            let response = match self.client.send(&request).await {
                Ok(response) => {
                    observer.on_api_exchange(&request, Ok(&response));
                    response
                }
                Err(err) => {
                    observer.on_api_exchange(&request, Err(&err));
                    tracing::warn!(error = %err, turns, "model request failed");
                    return finish(history, turns, Termination::Failed(err), observer);
                }
            };
            if let Some(usage) = response.usage {
                tracing::debug!(
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    stop_reason = response.stop_reason.as_deref().unwrap_or(""),
                    "model turn received"
                );
            }

            let blocks: Vec<_> = response
                .content
                .into_iter()
                .filter(|block| !block.is_empty_text())
                .collect();
            for block in &blocks {
                observer.on_block(block);
            }
            let reply = Message::assistant(blocks);
            let calls: Vec<(String, String, serde_json::Value)> = reply
                .tool_uses()
                .map(|call| (call.id.to_string(), call.name.to_string(), call.input.clone()))
                .collect();
            history.push(reply);

            if calls.is_empty() {
                return finish(history, turns, Termination::Done, observer);
            }

            enter(LoopState::DispatchingTools, observer);
            let mut results = Vec::with_capacity(calls.len());
            for (id, name, input) in calls {
                let result = self.tools.dispatch(&name, &input).await;
                observer.on_tool_result(&id, &name, &result);
                results.push(result.to_content_block(&id));
            }
            history.push(Message::tool_results(results));
        }
    }
}

fn enter(state: LoopState, observer: &mut dyn LoopObserver) {
    tracing::debug!(?state, "conversation state");
    observer.on_state(state);
}

fn finish(
    history: Vec<Message>,
    turns: usize,
    termination: Termination,
    observer: &mut dyn LoopObserver,
) -> LoopOutcome {
    let outcome = LoopOutcome {
        history,
        turns,
        termination,
    };
    enter(outcome.state(), observer);
    outcome
}

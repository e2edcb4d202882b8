//! Data model for the Anthropic Messages API.
//!
//! These types serialize/deserialize directly to/from the JSON payloads of
//! `POST /v1/messages`. Content blocks the client does not model are kept as
//! raw JSON and sent back verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Message roles
// ---------------------------------------------------------------------------

/// Conversation participant role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user message, also carries tool results.
    User,
    /// Assistant/model message.
    Assistant,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A single message in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Author role for this conversation turn.
    pub role: Role,
    /// Ordered content blocks.
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Create a user message holding one text block.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Create an assistant message from response blocks.
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// Create the user message that answers a batch of tool invocations.
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: results,
        }
    }

    /// Concatenated text of every text block, separated by newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Tool invocations in source order.
    pub fn tool_uses(&self) -> impl Iterator<Item = ToolUse<'_>> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some(ToolUse { id, name, input }),
            _ => None,
        })
    }
}

/// Borrowed view of a `tool_use` block.
#[derive(Debug, Clone, Copy)]
pub struct ToolUse<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub input: &'a Value,
}

// ---------------------------------------------------------------------------
// Content blocks
// ---------------------------------------------------------------------------

/// One unit of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireBlock", into = "WireBlock")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: ToolResultContent,
        is_error: bool,
    },
    /// Any block type this client does not model, passed through untouched.
    Other(Value),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// True for text blocks whose text is empty or whitespace only.
    pub fn is_empty_text(&self) -> bool {
        matches!(self, Self::Text { text } if text.trim().is_empty())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireBlock {
    Known(KnownBlock),
    Other(Value),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: ToolResultContent,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl From<WireBlock> for ContentBlock {
    fn from(wire: WireBlock) -> Self {
        match wire {
            WireBlock::Known(KnownBlock::Text { text }) => Self::Text { text },
            WireBlock::Known(KnownBlock::ToolUse { id, name, input }) => {
                Self::ToolUse { id, name, input }
            }
            WireBlock::Known(KnownBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            }) => Self::ToolResult {
                tool_use_id,
                content,
                is_error,
            },
            WireBlock::Other(raw) => Self::Other(raw),
        }
    }
}

impl From<ContentBlock> for WireBlock {
    fn from(block: ContentBlock) -> Self {
        match block {
            ContentBlock::Text { text } => Self::Known(KnownBlock::Text { text }),
            ContentBlock::ToolUse { id, name, input } => {
                Self::Known(KnownBlock::ToolUse { id, name, input })
            }
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => Self::Known(KnownBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            }),
            ContentBlock::Other(raw) => Self::Other(raw),
        }
    }
}

// ---------------------------------------------------------------------------
// Tool results
// ---------------------------------------------------------------------------

/// Body of a `tool_result` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    /// Plain text, used for error results.
    Text(String),
    /// Text and image parts, used for successful results.
    Parts(Vec<ToolResultPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolResultPart {
    Text { text: String },
    Image { source: ImageSource },
}

/// Inline base64 image source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub media_type: String,
    pub data: String,
}

impl ImageSource {
    /// Base64 PNG source.
    pub fn png_base64(data: String) -> Self {
        Self {
            kind: "base64".into(),
            media_type: "image/png".into(),
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Tool definitions (sent in requests)
// ---------------------------------------------------------------------------

/// Tool definition included in the request so the model knows what's available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Exposed tool name.
    pub name: String,
    /// Natural-language description of tool behavior.
    pub description: String,
    /// JSON Schema object describing the parameters.
    pub input_schema: Value,
}

// ---------------------------------------------------------------------------
// Messages request / response
// ---------------------------------------------------------------------------

/// Request body for `POST /v1/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub system: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

/// Response body from `POST /v1/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub id: String,
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// Token usage reported by the API.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

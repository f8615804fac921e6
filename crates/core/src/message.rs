//! Message and Conversation domain types.
//!
//! These are the value objects that flow through a chat turn:
//! user asks → agent builds history → adapter sends it to the model →
//! tool results and answers are appended back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AgentError;

/// Unique identifier for a conversation (chat session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System instructions (prompt, tool descriptions)
    System,
    /// The end user
    User,
    /// The model
    Assistant,
    /// Observation produced by executing a tool
    ToolResult,
}

/// One part of a multimodal message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    /// Inline image, always held as raw base64 (no `data:` prefix).
    Image {
        data: String,
    },
    /// Any part type this crate does not understand. Adapters reject it.
    #[serde(other)]
    Unsupported,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Build an image part from either a `data:<mime>;base64,<payload>` URI
    /// or a bare base64 payload. Both normalize to the bare payload.
    pub fn image(encoded: impl AsRef<str>) -> Self {
        Self::Image {
            data: strip_data_uri(encoded.as_ref()).to_string(),
        }
    }
}

/// Strip a `data:...;base64,` prefix, returning the raw base64 payload.
pub fn strip_data_uri(encoded: &str) -> &str {
    let trimmed = encoded.trim();
    if trimmed.starts_with("data:") {
        if let Some((_, payload)) = trimmed.split_once(',') {
            return payload;
        }
    }
    trimmed
}

/// Message body: plain text or an ordered list of multimodal parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Text view of the content; image parts are skipped, text parts are
    /// joined with newlines.
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Text(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Text(s.to_string())
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The content
    pub content: MessageContent,

    /// On an assistant message: the tool call it requested.
    /// On a tool-result message: the tool call it answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: MessageContent) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    /// Create a new system message.
    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// Create an assistant message that requests tool call `tool_call_id`.
    pub fn tool_request(tool_call_id: impl Into<String>, content: impl Into<MessageContent>) -> Self {
        let mut msg = Self::with_role(Role::Assistant, content.into());
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<MessageContent>) -> Self {
        let mut msg = Self::with_role(Role::ToolResult, content.into());
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// Text view of this message's content.
    pub fn text(&self) -> String {
        self.content.as_text()
    }
}

/// A conversation is an ordered sequence of messages with shared context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    /// Ordered messages
    pub messages: Vec<Message>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a message to the conversation.
    ///
    /// Tool results must go through [`Conversation::push_tool_result`].
    pub fn push(&mut self, message: Message) -> Result<(), AgentError> {
        if message.role == Role::ToolResult {
            return self.push_tool_result(message);
        }
        self.append(message);
        Ok(())
    }

    /// Append a tool result. The previous message must be the assistant
    /// message that requested the same tool call.
    pub fn push_tool_result(&mut self, message: Message) -> Result<(), AgentError> {
        let answers_last = match self.messages.last() {
            Some(last) => {
                last.role == Role::Assistant
                    && last.tool_call_id.is_some()
                    && last.tool_call_id == message.tool_call_id
            }
            None => false,
        };
        if !answers_last {
            return Err(AgentError::OrphanToolResult);
        }
        self.append(message);
        Ok(())
    }

    fn append(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

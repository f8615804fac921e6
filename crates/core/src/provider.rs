//! ModelAdapter trait — the abstraction over chat backends.
//!
//! An adapter knows how to translate a conversation into one backend's wire
//! format and return the model's reply as a single block of text. The agent
//! loop receives an `Arc<dyn ModelAdapter>` and never knows which backend
//! it is talking to.
//!
//! Implementations: Ollama (native API), OpenAI-compatible endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// A chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to use (e.g., "llama3", "llama3:instruct")
    pub model: String,

    /// The conversation messages, in order
    pub messages: Vec<Message>,

    /// Tools described to the model. Text-protocol backends already carry
    /// these in the system prompt; adapters may ignore the field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDescriptor>,

    /// Temperature (0.0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// Description of a tool, as embedded in prompts.
///
/// Serializes to exactly `{"name", "description", "arguments"}`; the prompt's
/// schema example depends on the model mimicking this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// The tool name, unique within a registry
    pub name: String,

    /// What the tool does
    pub description: String,

    /// JSON-schema-like description of the tool's arguments
    pub arguments: serde_json::Value,
}

/// A complete (non-streaming) reply from a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The raw text the model produced
    pub text: String,

    /// Which model actually responded
    pub model: String,

    /// Token usage statistics, when the backend reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// An embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The embedding model (e.g., "nomic-embed-text").
    pub model: String,

    /// The texts to embed.
    pub inputs: Vec<String>,
}

/// An embedding response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// One vector per input text, in input order.
    pub embeddings: Vec<Vec<f32>>,

    pub model: String,
}

/// Which wire role a tool-result message is sent as.
///
/// Many local backends have no tool-result role; sending the observation as
/// `user` or `assistant` is a compatibility shim, not part of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolResultRole {
    User,
    Assistant,
    Tool,
}

/// The core ModelAdapter trait.
///
/// Every chat backend implements this trait. The agent loop calls
/// `complete()` without knowing which backend is used.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// A human-readable name for this adapter (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send a request and get the complete text reply.
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Generate embeddings for the given texts.
    ///
    /// Default implementation reports embeddings as unsupported.
    async fn embed(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Err(ProviderError::NotConfigured(format!(
            "Adapter '{}' does not support embeddings",
            self.name()
        )))
    }
}

//! Error types for the VaultMind domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// The top-level error type for all VaultMind operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Agent loop errors ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by [`ToolError::Execution`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    /// A message part the adapter cannot translate (neither text nor image).
    #[error("Unsupported message content: {0}")]
    UnsupportedContent(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool execution failed: {tool_name}: {source}")]
    Execution {
        tool_name: String,
        #[source]
        source: BoxError,
    },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

impl ToolError {
    /// Wrap any error as an execution failure of `tool_name`.
    pub fn execution(tool_name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Execution {
            tool_name: tool_name.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent gave up after {limit} model turns without a final answer")]
    IterationLimitExceeded { limit: u32 },

    /// The model asked for a tool the registry does not know.
    #[error("Model requested unknown tool: {0}")]
    UnknownTool(String),

    #[error("Agent run was cancelled")]
    Cancelled,

    #[error("Model call timed out after {timeout_secs}s")]
    ModelTimeout { timeout_secs: u64 },

    #[error("Tool result must directly follow the assistant message that requested it")]
    OrphanToolResult,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

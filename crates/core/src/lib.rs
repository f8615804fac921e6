//! # VaultMind Core
//!
//! Domain types, traits, and error definitions for VaultMind, a
//! retrieval-augmented chat over a collection of Markdown notes.
//! This crate has **no HTTP or storage dependencies** — it defines the
//! domain model that the other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator is a trait here. Implementations live in their
//! respective crates:
//! - [`ModelAdapter`] — a chat backend (Ollama, OpenAI-compatible)
//! - [`Tool`] — a capability the model can request by name
//! - [`VectorStore`], [`Retriever`], [`Embedder`] — the retrieval stack

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod retrieval;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{AgentError, BoxError, Error, ProviderError, Result, RetrievalError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{
    ContentPart, Conversation, ConversationId, Message, MessageContent, Role, strip_data_uri,
};
pub use provider::{
    ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, ModelAdapter, ToolDescriptor,
    ToolResultRole, Usage,
};
pub use retrieval::{
    Document, Embedder, FILE_PATH_KEY, Retriever, ScoredDocument, VectorStore, unique_source_paths,
};
pub use tool::{Tool, ToolInvocation, ToolOutput, ToolRegistry};

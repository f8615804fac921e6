//! Chat chains — the three ways a session can answer a message.
//!
//! - [`AgentChain`]: the tool-calling agent loop, with chat history
//! - [`RagChain`]: retrieve passages once, answer once
//! - [`SimpleChain`]: answer from the model alone
//!
//! [`ChatSession`] owns one chain, picked by [`ChatMode`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vaultmind_config::{AppConfig, ChatMode};
use vaultmind_core::Error;
use vaultmind_core::error::AgentError;
use vaultmind_core::event::EventBus;
use vaultmind_core::message::{ContentPart, Conversation, Message, MessageContent};
use vaultmind_core::provider::{ChatRequest, ModelAdapter};
use vaultmind_core::retrieval::{Document, Retriever, unique_source_paths};
use vaultmind_core::tool::ToolRegistry;

use crate::executor::AgentExecutor;
use crate::scratchpad::AgentStep;

/// What the user sees after sending a message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub answer: String,
    /// Note paths the answer may draw on; unique, first-seen order.
    pub sources: Vec<String>,
    /// Tool rounds taken, empty outside agent mode.
    pub steps: Vec<AgentStep>,
}

#[async_trait]
pub trait ChatChain: Send + Sync {
    fn mode(&self) -> ChatMode;

    async fn send_message(
        &mut self,
        input: Message,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, Error>;
}

pub fn rag_prompt(context: &str, question: &str) -> String {
    format!(
        "Using the context provided (if any), answer the question from the user.\n\nContext: {context}\n-------\n\nQuestion: {question}"
    )
}

pub fn simple_prompt(question: &str) -> String {
    format!(
        "You are an amazing AI designed to help users with their queries. Answer the question from the user:\n\nQuestion: {question}"
    )
}

/// Passage contents, each preceded by a blank line.
fn format_docs(docs: &[Document]) -> String {
    let joined = docs
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("\n\n{joined}")
}

/// `input` with its text replaced by `text`; image parts are kept.
fn with_text(input: &Message, text: String) -> Message {
    match &input.content {
        MessageContent::Parts(parts) if parts.iter().any(|p| matches!(p, ContentPart::Image { .. })) => {
            let mut content = vec![ContentPart::text(text)];
            content.extend(
                parts
                    .iter()
                    .filter(|p| matches!(p, ContentPart::Image { .. }))
                    .cloned(),
            );
            Message::user(MessageContent::Parts(content))
        }
        _ => Message::user(text),
    }
}

/// Single-call chain settings shared by [`RagChain`] and [`SimpleChain`].
struct ModelSettings {
    adapter: Arc<dyn ModelAdapter>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ModelSettings {
    fn from_config(adapter: Arc<dyn ModelAdapter>, config: &AppConfig) -> Self {
        Self {
            adapter,
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        }
    }

    async fn ask(&self, message: Message) -> Result<String, Error> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![message],
            tools: Vec::new(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response = self.adapter.complete(request).await?;
        Ok(response.text.trim().to_string())
    }
}

/// The tool-calling agent, remembering the conversation so far.
pub struct AgentChain {
    executor: AgentExecutor,
    retriever: Arc<dyn Retriever>,
    history: Conversation,
}

impl AgentChain {
    pub fn new(executor: AgentExecutor, retriever: Arc<dyn Retriever>) -> Self {
        Self {
            executor,
            retriever,
            history: Conversation::new(),
        }
    }

    pub fn history(&self) -> &Conversation {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history = Conversation::new();
    }
}

#[async_trait]
impl ChatChain for AgentChain {
    fn mode(&self) -> ChatMode {
        ChatMode::Agent
    }

    async fn send_message(
        &mut self,
        input: Message,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, Error> {
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled.into());
        }

        // Sources are for citation only; a failed lookup leaves them empty.
        let sources = match self.retriever.retrieve(&input.text()).await {
            Ok(docs) => unique_source_paths(&docs),
            Err(e) => {
                warn!(error = %e, "Source lookup failed");
                Vec::new()
            }
        };

        let outcome = self
            .executor
            .run(&self.history.messages, &input, cancel)
            .await?;

        self.history.push(input)?;
        self.history.push(Message::assistant(outcome.answer.clone()))?;

        Ok(ChatReply {
            answer: outcome.answer,
            sources,
            steps: outcome.steps,
        })
    }
}

/// Retrieve once, then answer from the retrieved context.
pub struct RagChain {
    settings: ModelSettings,
    retriever: Arc<dyn Retriever>,
}

impl RagChain {
    pub fn new(adapter: Arc<dyn ModelAdapter>, retriever: Arc<dyn Retriever>, config: &AppConfig) -> Self {
        Self {
            settings: ModelSettings::from_config(adapter, config),
            retriever,
        }
    }
}

#[async_trait]
impl ChatChain for RagChain {
    fn mode(&self) -> ChatMode {
        ChatMode::Rag
    }

    async fn send_message(
        &mut self,
        input: Message,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, Error> {
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled.into());
        }

        let question = input.text();
        let docs = self.retriever.retrieve(&question).await?;
        debug!(passages = docs.len(), "Retrieved context");

        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled.into());
        }

        let prompt = rag_prompt(&format_docs(&docs), &question);
        let answer = self.settings.ask(with_text(&input, prompt)).await?;

        Ok(ChatReply {
            answer,
            sources: unique_source_paths(&docs),
            steps: Vec::new(),
        })
    }
}

/// Answer from the model alone.
pub struct SimpleChain {
    settings: ModelSettings,
}

impl SimpleChain {
    pub fn new(adapter: Arc<dyn ModelAdapter>, config: &AppConfig) -> Self {
        Self {
            settings: ModelSettings::from_config(adapter, config),
        }
    }
}

#[async_trait]
impl ChatChain for SimpleChain {
    fn mode(&self) -> ChatMode {
        ChatMode::Simple
    }

    async fn send_message(
        &mut self,
        input: Message,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, Error> {
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled.into());
        }

        let prompt = simple_prompt(&input.text());
        let answer = self.settings.ask(with_text(&input, prompt)).await?;

        Ok(ChatReply {
            answer,
            sources: Vec::new(),
            steps: Vec::new(),
        })
    }
}

/// One user's chat: a chain plus the settings it was built from.
pub struct ChatSession {
    chain: Box<dyn ChatChain>,
}

impl ChatSession {
    pub fn new(chain: Box<dyn ChatChain>) -> Self {
        Self { chain }
    }

    /// Build the chain for `mode`. `tools` is only used in agent mode.
    pub fn from_config(
        config: &AppConfig,
        mode: ChatMode,
        adapter: Arc<dyn ModelAdapter>,
        retriever: Arc<dyn Retriever>,
        tools: Arc<ToolRegistry>,
        event_bus: Option<Arc<EventBus>>,
    ) -> Self {
        let chain: Box<dyn ChatChain> = match mode {
            ChatMode::Agent => {
                let mut executor = AgentExecutor::from_config(adapter, tools, config);
                if let Some(bus) = event_bus {
                    executor = executor.with_event_bus(bus);
                }
                Box::new(AgentChain::new(executor, retriever))
            }
            ChatMode::Rag => Box::new(RagChain::new(adapter, retriever, config)),
            ChatMode::Simple => Box::new(SimpleChain::new(adapter, config)),
        };
        Self { chain }
    }

    pub fn mode(&self) -> ChatMode {
        self.chain.mode()
    }

    pub async fn send_message(
        &mut self,
        input: Message,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, Error> {
        self.chain.send_message(input, cancel).await
    }

    /// Send plain text with a fresh cancellation token.
    pub async fn ask(&mut self, text: &str) -> Result<ChatReply, Error> {
        self.send_message(Message::user(text), &CancellationToken::new())
            .await
    }
}

//! Shared test doubles for agent and chain tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use vaultmind_core::error::{ProviderError, RetrievalError, ToolError};
use vaultmind_core::provider::{ChatRequest, ChatResponse, ModelAdapter, Usage};
use vaultmind_core::retrieval::{Document, FILE_PATH_KEY, Retriever};
use vaultmind_core::tool::{Tool, ToolOutput};

/// A model that replays scripted replies, one per call.
///
/// Once the script runs out, calls fail with an API error, unless the
/// adapter was built with [`ScriptedAdapter::always`].
pub struct ScriptedAdapter {
    replies: Mutex<VecDeque<String>>,
    repeat: Option<String>,
    delay: Option<Duration>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedAdapter {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            repeat: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reply with `text` on every call.
    pub fn always(text: &str) -> Self {
        let mut adapter = Self::new(&[]);
        adapter.repeat = Some(text.to_string());
        adapter
    }

    /// Sleep before each reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.replies.lock().unwrap().pop_front();
        let text = next.or_else(|| self.repeat.clone()).ok_or_else(|| {
            ProviderError::ApiError {
                status_code: 500,
                message: "script exhausted".into(),
            }
        })?;

        Ok(ChatResponse {
            text,
            model,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        })
    }
}

/// A tool that always returns the same observation and counts its calls.
pub struct StaticTool {
    name: String,
    reply: String,
    calls: AtomicUsize,
}

impl StaticTool {
    pub fn new(name: &str, reply: &str) -> Self {
        Self {
            name: name.to_string(),
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "returns a fixed observation"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "query": { "type": "string" } }
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ToolOutput::Text(self.reply.clone()))
    }
}

/// A retriever over a fixed list of `(file path, content)` passages that
/// returns every passage for any query.
pub struct FixedRetriever {
    passages: Vec<(String, String)>,
}

impl FixedRetriever {
    pub fn new(passages: &[(&str, &str)]) -> Self {
        Self {
            passages: passages
                .iter()
                .map(|(path, content)| (path.to_string(), content.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl Retriever for FixedRetriever {
    async fn retrieve(&self, _query: &str) -> Result<Vec<Document>, RetrievalError> {
        Ok(self
            .passages
            .iter()
            .map(|(path, content)| {
                Document::new(content.as_str()).with_metadata(FILE_PATH_KEY, serde_json::json!(path))
            })
            .collect())
    }
}

//! End-to-end integration tests for VaultMind.
//!
//! These tests run the whole pipeline over a real notes directory: indexing,
//! retrieval, the tool registry, the agent loop and the chat chains.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use vaultmind_agent::ChatSession;
use vaultmind_config::{AppConfig, ChatMode};
use vaultmind_core::error::ProviderError;
use vaultmind_core::event::{DomainEvent, EventBus};
use vaultmind_core::message::{Message, Role};
use vaultmind_core::provider::{
    ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, ModelAdapter,
};
use vaultmind_core::retrieval::{Embedder, VectorStore};
use vaultmind_vectors::{AdapterEmbedder, ContentRetriever, InMemoryVectorStore, NoteIndexer};

// ── Mock Adapter ─────────────────────────────────────────────────────────

const VOCABULARY: &[&str] = &["paris", "louvre", "budget", "rome"];

/// Replies from a script and embeds text as keyword counts.
struct ScriptedAdapter {
    replies: Mutex<Vec<String>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedAdapter {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    VOCABULARY
        .iter()
        .map(|w| lower.matches(w).count() as f32)
        .collect()
}

#[async_trait::async_trait]
impl ModelAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        let text = self
            .replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 500,
                message: "script exhausted".into(),
            })?;
        Ok(ChatResponse {
            text,
            model,
            usage: None,
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|t| keyword_vector(t)).collect(),
            model: request.model,
        })
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn write_vault(root: &Path) {
    std::fs::create_dir_all(root.join("travel")).unwrap();
    std::fs::create_dir_all(root.join(".trash")).unwrap();
    std::fs::write(root.join("travel/paris.md"), "# Paris\n\nTrip in May. #travel\n").unwrap();
    std::fs::write(root.join("budget.md"), "Budget for the year is 2000 euros.\n").unwrap();
    std::fs::write(root.join(".trash/old.md"), "Old Paris plans.\n").unwrap();
}

struct Pipeline {
    adapter: Arc<ScriptedAdapter>,
    store: Arc<InMemoryVectorStore>,
    retriever: Arc<ContentRetriever>,
    events: Arc<EventBus>,
    passages: usize,
}

async fn pipeline(root: &Path, replies: &[&str]) -> Pipeline {
    let config = AppConfig::default();
    let adapter = Arc::new(ScriptedAdapter::new(replies));
    let embedder: Arc<dyn Embedder> = Arc::new(AdapterEmbedder::new(
        adapter.clone(),
        config.llm.embedding_model.clone(),
    ));
    let store = Arc::new(InMemoryVectorStore::new(embedder));
    let events = Arc::new(EventBus::default());

    let passages = NoteIndexer::new(root, store.clone())
        .with_events(events.clone())
        .index_all()
        .await
        .unwrap();
    let retriever = Arc::new(
        ContentRetriever::new(store.clone())
            .with_min_similarity_score(config.vectors.min_similarity_score)
            .with_max_k(config.vectors.max_k),
    );

    Pipeline {
        adapter,
        store,
        retriever,
        events,
        passages,
    }
}

fn session(p: &Pipeline, mode: ChatMode) -> ChatSession {
    let config = AppConfig::default();
    let tools = Arc::new(
        vaultmind_tools::default_registry(
            p.adapter.clone(),
            config.llm.model.clone(),
            p.retriever.clone(),
            None,
        )
        .unwrap(),
    );
    ChatSession::from_config(
        &config,
        mode,
        p.adapter.clone(),
        p.retriever.clone(),
        tools,
        Some(p.events.clone()),
    )
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_indexing_skips_hidden_directories() {
    let dir = tempfile::tempdir().unwrap();
    write_vault(dir.path());

    let p = pipeline(dir.path(), &[]).await;
    assert_eq!(p.passages, 2);
    assert_eq!(p.store.len().await, 2);
}

#[tokio::test]
async fn e2e_agent_searches_notes_then_answers() {
    let dir = tempfile::tempdir().unwrap();
    write_vault(dir.path());

    let p = pipeline(
        dir.path(),
        &[
            r#"```json
{"tool_calls": [{"name": "retriever-tool", "arguments": {"query": "paris"}}]}
```"#,
            "Final Answer: Your Paris trip is in May.",
        ],
    )
    .await;
    let mut tool_events = p.events.subscribe();
    let mut chat = session(&p, ChatMode::Agent);

    let reply = chat.ask("When is my Paris trip?").await.unwrap();

    assert_eq!(reply.answer, "Your Paris trip is in May.");
    assert_eq!(reply.sources, vec!["travel/paris.md"]);
    assert_eq!(reply.steps.len(), 1);
    assert_eq!(reply.steps[0].request.tool_name, "retriever-tool");
    assert!(reply.steps[0].observation.contains("Trip in May."));
    assert!(!reply.steps[0].observation.contains("Budget"));

    // The second model call saw the note passage as a tool result
    let requests = p.adapter.requests();
    assert_eq!(requests.len(), 2);
    let last = requests[1].messages.last().unwrap();
    assert_eq!(last.role, Role::ToolResult);
    assert!(last.text().contains("DOCUMENT NAME: paris.md"));

    let executed = loop {
        match tool_events.recv().await.unwrap().as_ref() {
            DomainEvent::ToolExecuted {
                tool_name, success, ..
            } => break (tool_name.clone(), *success),
            _ => continue,
        }
    };
    assert_eq!(executed, ("retriever-tool".to_string(), true));
}

#[tokio::test]
async fn e2e_agent_remembers_earlier_turns() {
    let dir = tempfile::tempdir().unwrap();
    write_vault(dir.path());

    let p = pipeline(
        dir.path(),
        &["Final Answer: Hello!", "Final Answer: You said hi."],
    )
    .await;
    let mut chat = session(&p, ChatMode::Agent);

    chat.ask("hi").await.unwrap();
    let reply = chat.ask("What did I say?").await.unwrap();
    assert_eq!(reply.answer, "You said hi.");

    let requests = p.adapter.requests();
    let texts: Vec<String> = requests[1].messages.iter().map(|m| m.text()).collect();
    assert!(texts.iter().any(|t| t == "hi"));
    assert!(texts.iter().any(|t| t == "Hello!"));
    assert_eq!(texts.last().unwrap(), "What did I say?");
}

#[tokio::test]
async fn e2e_query_response_tool_ends_the_run() {
    let dir = tempfile::tempdir().unwrap();
    write_vault(dir.path());

    let p = pipeline(
        dir.path(),
        &[r#"{"tool": "query-response", "tool_input": {"response": "Budget is 2000 euros."}}"#],
    )
    .await;
    let mut chat = session(&p, ChatMode::Agent);

    let reply = chat.ask("What is the budget?").await.unwrap();
    assert_eq!(reply.answer, "Budget is 2000 euros.");
    assert_eq!(reply.sources, vec!["budget.md"]);
    assert_eq!(p.adapter.requests().len(), 1);
}

#[tokio::test]
async fn e2e_rag_answers_from_retrieved_context() {
    let dir = tempfile::tempdir().unwrap();
    write_vault(dir.path());

    let p = pipeline(dir.path(), &["The budget is 2000 euros."]).await;
    let mut chat = session(&p, ChatMode::Rag);

    let reply = chat.ask("What is the budget?").await.unwrap();
    assert_eq!(reply.answer, "The budget is 2000 euros.");
    assert_eq!(reply.sources, vec!["budget.md"]);

    let requests = p.adapter.requests();
    assert_eq!(requests.len(), 1);
    let prompt = requests[0].messages.last().unwrap().text();
    assert!(prompt.contains("Budget for the year is 2000 euros."));
    assert!(!prompt.contains("Trip in May."));
}

#[tokio::test]
async fn e2e_simple_mode_skips_retrieval() {
    let dir = tempfile::tempdir().unwrap();
    write_vault(dir.path());

    let p = pipeline(dir.path(), &["Hi there."]).await;
    let mut chat = session(&p, ChatMode::Simple);

    let reply = chat.ask("What is the budget?").await.unwrap();
    assert_eq!(reply.answer, "Hi there.");
    assert!(reply.sources.is_empty());

    let prompt = p.adapter.requests()[0].messages.last().unwrap().text();
    assert!(!prompt.contains("2000 euros"));
}

#[tokio::test]
async fn e2e_cancelled_message_never_reaches_the_model() {
    let dir = tempfile::tempdir().unwrap();
    write_vault(dir.path());

    let p = pipeline(dir.path(), &["Final Answer: unused"]).await;
    let mut chat = session(&p, ChatMode::Agent);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = chat
        .send_message(Message::user("hi"), &cancel)
        .await
        .unwrap_err();
    assert!(err.to_string().to_lowercase().contains("cancel"));
    assert!(p.adapter.requests().is_empty());
}

#[tokio::test]
async fn e2e_ollama_backend_over_http() {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embedding": [1.0, 0.0, 0.0]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3",
            "message": {
                "role": "assistant",
                "content": "{\"tool_calls\": [{\"name\": \"retriever-tool\", \"arguments\": {\"query\": \"notes\"}}]}"
            },
            "done": true
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3",
            "message": {"role": "assistant", "content": "Final Answer: Found two notes."},
            "done": true
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_vault(dir.path());

    let mut config = AppConfig::default();
    config.llm.base_url = server.uri();
    let adapter = vaultmind_providers::build_adapter(&config).unwrap();
    let embedder: Arc<dyn Embedder> = Arc::new(AdapterEmbedder::new(
        adapter.clone(),
        config.llm.embedding_model.clone(),
    ));
    let store = Arc::new(InMemoryVectorStore::new(embedder));
    NoteIndexer::new(dir.path(), store.clone())
        .index_all()
        .await
        .unwrap();
    let retriever = Arc::new(ContentRetriever::new(store));
    let tools = Arc::new(
        vaultmind_tools::default_registry(
            adapter.clone(),
            config.llm.model.clone(),
            retriever.clone(),
            None,
        )
        .unwrap(),
    );

    let mut chat =
        ChatSession::from_config(&config, ChatMode::Agent, adapter, retriever, tools, None);
    let reply = chat.ask("What notes do I have?").await.unwrap();

    assert_eq!(reply.answer, "Found two notes.");
    let mut sources = reply.sources.clone();
    sources.sort();
    assert_eq!(sources, vec!["budget.md", "travel/paris.md"]);
    assert_eq!(reply.steps.len(), 1);
}

pub mod chat;
pub mod config_cmd;
pub mod index;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use vaultmind_config::AppConfig;
use vaultmind_core::event::EventBus;
use vaultmind_core::provider::{ModelAdapter, ToolResultRole};
use vaultmind_core::retrieval::Embedder;
use vaultmind_vectors::{AdapterEmbedder, InMemoryVectorStore, MarkdownSplitter, NoteIndexer};

/// Everything built from the config and an indexed notes directory.
pub struct Vault {
    pub adapter: Arc<dyn ModelAdapter>,
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<InMemoryVectorStore>,
    pub events: Arc<EventBus>,
    pub passages: usize,
}

/// `--notes` if given, otherwise `notes_dir` from the config.
pub fn resolve_notes_dir(
    config: &AppConfig,
    notes: Option<PathBuf>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = notes.or_else(|| config.notes_dir.clone()).ok_or_else(|| {
        format!(
            "No notes directory given. Pass --notes <DIR> or set notes_dir in {}",
            AppConfig::config_dir().join("config.toml").display()
        )
    })?;
    if !dir.is_dir() {
        return Err(format!("Notes directory not found: {}", dir.display()).into());
    }
    Ok(dir)
}

/// Build the model adapter and index every note under `notes_dir`.
pub async fn open_vault(
    config: &AppConfig,
    notes_dir: &Path,
) -> Result<Vault, Box<dyn std::error::Error>> {
    let adapter = vaultmind_providers::build_adapter(config)?;
    debug!(provider = %adapter.name(), model = %config.llm.model, "Model adapter ready");
    let embedder: Arc<dyn Embedder> = Arc::new(AdapterEmbedder::new(
        adapter.clone(),
        config.llm.embedding_model.clone(),
    ));
    let store = Arc::new(InMemoryVectorStore::new(embedder.clone()));
    let events = Arc::new(EventBus::default());

    let indexer = NoteIndexer::new(notes_dir, store.clone())
        .with_splitter(MarkdownSplitter::new(
            config.vectors.chunk_size,
            config.vectors.chunk_overlap,
        ))
        .with_events(events.clone());
    let passages = indexer
        .index_all()
        .await
        .map_err(|e| format!("Failed to index {}: {e}", notes_dir.display()))?;
    debug!(notes_dir = %notes_dir.display(), passages, "Vault opened");

    Ok(Vault {
        adapter,
        embedder,
        store,
        events,
        passages,
    })
}

/// Human-readable name of the tool-result role in use.
pub fn tool_result_role_name(config: &AppConfig) -> &'static str {
    let role = config.llm.tool_result_role.unwrap_or(match config.llm.provider.as_str() {
        "openai" => ToolResultRole::Tool,
        _ => ToolResultRole::Assistant,
    });
    match role {
        ToolResultRole::User => "user",
        ToolResultRole::Assistant => "assistant",
        ToolResultRole::Tool => "tool",
    }
}

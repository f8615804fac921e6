//! Retrieval traits — the narrow seam between chat and the notes index.
//!
//! The agent only ever asks a [`Retriever`] for passages. How those passages
//! are embedded and stored sits behind [`Embedder`] and [`VectorStore`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// Metadata key holding the path of the note a passage came from.
pub const FILE_PATH_KEY: &str = "filePath";

/// A passage of a note, as stored in the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The passage text (including its document-name header)
    pub content: String,

    /// Free-form metadata; indexed notes always carry `filePath`
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: serde_json::Map::new(),
            id: None,
        }
    }

    /// Builder-style metadata setter.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The source note path, if recorded.
    pub fn file_path(&self) -> Option<&str> {
        self.metadata.get(FILE_PATH_KEY).and_then(|v| v.as_str())
    }
}

/// A document with its similarity to a query (higher is closer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

/// Turns text into vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of passages, one vector per input in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RetrievalError::EmbeddingFailed("embedder returned no vector".into()))
    }
}

/// Storage for embedded passages.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Add documents. When `ids` is given it must have one id per document;
    /// an id that already exists is replaced. Returns the ids stored.
    async fn add_documents(
        &self,
        documents: Vec<Document>,
        ids: Option<Vec<String>>,
    ) -> Result<Vec<String>, RetrievalError>;

    /// Remove every passage whose `filePath` equals `file_path`.
    /// Returns the number removed.
    async fn delete_documents_for_file(&self, file_path: &str) -> Result<usize, RetrievalError>;

    /// The `k` passages most similar to `query`, best first.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredDocument>, RetrievalError>;

    /// Number of stored passages.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Finds passages relevant to a query.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrievalError>;
}

/// Unique source note paths, in first-seen order.
pub fn unique_source_paths(documents: &[Document]) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for path in documents.iter().filter_map(Document::file_path) {
        if !paths.iter().any(|p| p == path) {
            paths.push(path.to_string());
        }
    }
    paths
}

//! In-memory vector store — the default collaborator for a single session.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;
use vaultmind_core::error::RetrievalError;
use vaultmind_core::retrieval::{Document, Embedder, ScoredDocument, VectorStore};

use crate::similarity::top_k;

struct StoredPassage {
    id: String,
    document: Document,
    embedding: Vec<f32>,
}

/// Stores embedded passages in a Vec and searches by cosine similarity.
pub struct InMemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    passages: RwLock<Vec<StoredPassage>>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            passages: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add_documents(
        &self,
        documents: Vec<Document>,
        ids: Option<Vec<String>>,
    ) -> Result<Vec<String>, RetrievalError> {
        let ids: Vec<String> = match ids {
            Some(ids) if ids.len() != documents.len() => {
                return Err(RetrievalError::Storage(format!(
                    "{} ids given for {} documents",
                    ids.len(),
                    documents.len()
                )));
            }
            Some(ids) => ids,
            None => documents
                .iter()
                .map(|d| d.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string()))
                .collect(),
        };

        if documents.is_empty() {
            return Ok(ids);
        }

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.embedder.embed_documents(&texts).await?;
        if embeddings.len() != documents.len() {
            return Err(RetrievalError::EmbeddingFailed(format!(
                "expected {} vectors, embedder returned {}",
                documents.len(),
                embeddings.len()
            )));
        }

        let mut passages = self.passages.write().await;
        for ((id, mut document), embedding) in ids.iter().cloned().zip(documents).zip(embeddings) {
            document.id = Some(id.clone());
            let passage = StoredPassage {
                id,
                document,
                embedding,
            };
            match passages.iter_mut().find(|p| p.id == passage.id) {
                Some(existing) => *existing = passage,
                None => passages.push(passage),
            }
        }
        debug!(added = ids.len(), total = passages.len(), "Stored passages");

        Ok(ids)
    }

    async fn delete_documents_for_file(&self, file_path: &str) -> Result<usize, RetrievalError> {
        let mut passages = self.passages.write().await;
        let before = passages.len();
        passages.retain(|p| p.document.file_path() != Some(file_path));
        Ok(before - passages.len())
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredDocument>, RetrievalError> {
        let query_embedding = self.embedder.embed_query(query).await?;
        let passages = self.passages.read().await;

        let ranked = top_k(
            passages.iter().map(|p| p.embedding.as_slice()),
            &query_embedding,
            k,
        );

        Ok(ranked
            .into_iter()
            .map(|(i, score)| ScoredDocument {
                document: passages[i].document.clone(),
                score,
            })
            .collect())
    }

    async fn len(&self) -> usize {
        self.passages.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::KeywordEmbedder;
    use serde_json::json;
    use vaultmind_core::retrieval::FILE_PATH_KEY;

    fn store() -> InMemoryVectorStore {
        InMemoryVectorStore::new(Arc::new(KeywordEmbedder::new(&["paris", "budget", "recipe"])))
    }

    fn note(content: &str, path: &str) -> Document {
        Document::new(content).with_metadata(FILE_PATH_KEY, json!(path))
    }

    #[tokio::test]
    async fn add_and_search() {
        let store = store();
        store
            .add_documents(
                vec![
                    note("paris trip in may", "travel.md"),
                    note("quarterly budget review", "work.md"),
                ],
                None,
            )
            .await
            .unwrap();

        let results = store.similarity_search("paris", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.file_path(), Some("travel.md"));
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!(results[0].document.id.is_some());
    }

    #[tokio::test]
    async fn readding_an_id_replaces_it() {
        let store = store();
        let ids = vec!["travel.md_0".to_string()];
        store
            .add_documents(vec![note("paris", "travel.md")], Some(ids.clone()))
            .await
            .unwrap();
        store
            .add_documents(vec![note("recipe for crepes", "travel.md")], Some(ids))
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        let results = store.similarity_search("recipe", 1).await.unwrap();
        assert_eq!(results[0].document.content, "recipe for crepes");
    }

    #[tokio::test]
    async fn mismatched_ids_rejected() {
        let store = store();
        let err = store
            .add_documents(vec![note("a", "a.md"), note("b", "b.md")], Some(vec!["x".into()]))
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Storage(_)));
    }

    #[tokio::test]
    async fn delete_by_file_path() {
        let store = store();
        store
            .add_documents(
                vec![
                    note("paris day one", "travel.md"),
                    note("paris day two", "travel.md"),
                    note("budget", "work.md"),
                ],
                None,
            )
            .await
            .unwrap();

        let removed = store.delete_documents_for_file("travel.md").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.len().await, 1);
        assert!(!store.is_empty().await);
    }

    #[tokio::test]
    async fn search_on_empty_store() {
        let results = store().similarity_search("paris", 5).await.unwrap();
        assert!(results.is_empty());
    }
}

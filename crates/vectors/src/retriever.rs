//! Score-threshold retriever over a vector store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use vaultmind_core::error::RetrievalError;
use vaultmind_core::retrieval::{Document, Retriever, ScoredDocument, VectorStore};

/// Default minimum cosine similarity for a passage to count as relevant.
pub const DEFAULT_MIN_SIMILARITY_SCORE: f32 = 0.7;

/// Default number of passages considered per query.
pub const DEFAULT_MAX_K: usize = 10;

/// Returns up to `max_k` passages scoring at least `min_similarity_score`.
pub struct ContentRetriever {
    store: Arc<dyn VectorStore>,
    min_similarity_score: f32,
    max_k: usize,
}

impl ContentRetriever {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            min_similarity_score: DEFAULT_MIN_SIMILARITY_SCORE,
            max_k: DEFAULT_MAX_K,
        }
    }

    pub fn with_min_similarity_score(mut self, score: f32) -> Self {
        self.min_similarity_score = score;
        self
    }

    pub fn with_max_k(mut self, max_k: usize) -> Self {
        self.max_k = max_k;
        self
    }

    /// Like [`Retriever::retrieve`] but keeps the scores.
    pub async fn retrieve_scored(&self, query: &str) -> Result<Vec<ScoredDocument>, RetrievalError> {
        let candidates = self.store.similarity_search(query, self.max_k).await?;
        let considered = candidates.len();
        let kept: Vec<ScoredDocument> = candidates
            .into_iter()
            .filter(|c| c.score >= self.min_similarity_score)
            .collect();
        debug!(
            considered,
            kept = kept.len(),
            min_score = self.min_similarity_score,
            "Retrieved passages"
        );
        Ok(kept)
    }
}

#[async_trait]
impl Retriever for ContentRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrievalError> {
        Ok(self
            .retrieve_scored(query)
            .await?
            .into_iter()
            .map(|c| c.document)
            .collect())
    }
}

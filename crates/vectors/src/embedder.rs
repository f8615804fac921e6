//! Embeddings served by the chat backend.

use std::sync::Arc;

use async_trait::async_trait;
use vaultmind_core::error::RetrievalError;
use vaultmind_core::provider::{EmbeddingRequest, ModelAdapter};
use vaultmind_core::retrieval::Embedder;

/// An [`Embedder`] that asks a [`ModelAdapter`] for vectors.
pub struct AdapterEmbedder {
    adapter: Arc<dyn ModelAdapter>,
    model: String,
}

impl AdapterEmbedder {
    pub fn new(adapter: Arc<dyn ModelAdapter>, model: impl Into<String>) -> Self {
        Self {
            adapter,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for AdapterEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let response = self
            .adapter
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: texts.to_vec(),
            })
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;
        Ok(response.embeddings)
    }
}

//! Notes index for VaultMind.
//!
//! Markdown notes are split into passages ([`MarkdownSplitter`]), embedded
//! through an [`Embedder`](vaultmind_core::Embedder), stored in a
//! [`VectorStore`](vaultmind_core::VectorStore), and found again by
//! [`ContentRetriever`] using cosine similarity with a score threshold.

pub mod embedder;
pub mod in_memory;
pub mod indexer;
pub mod retriever;
pub mod similarity;
pub mod splitter;

pub use embedder::AdapterEmbedder;
pub use in_memory::InMemoryVectorStore;
pub use indexer::{NoteIndexer, extract_links, extract_tags};
pub use retriever::ContentRetriever;
pub use similarity::cosine_similarity;
pub use splitter::MarkdownSplitter;

#[cfg(test)]
pub(crate) mod test_helpers;

//! `vaultmind index` — split and embed the notes directory.

use std::path::PathBuf;
use std::time::Instant;

use vaultmind_config::AppConfig;
use vaultmind_core::retrieval::VectorStore;

use super::{open_vault, resolve_notes_dir};

pub async fn run(notes: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let notes_dir = resolve_notes_dir(&config, notes)?;

    println!("Indexing {}", notes_dir.display());
    println!("   Embedding model: {}", config.llm.embedding_model);
    println!(
        "   Chunks:          {} chars, {} overlap",
        config.vectors.chunk_size, config.vectors.chunk_overlap
    );

    let started = Instant::now();
    let vault = open_vault(&config, &notes_dir).await?;

    println!();
    println!(
        "Indexed {} passages in {:.1}s",
        vault.store.len().await,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

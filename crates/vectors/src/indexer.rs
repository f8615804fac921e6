//! Keeps the vector store in step with a directory of Markdown notes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use chrono::Utc;
use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};
use vaultmind_core::error::RetrievalError;
use vaultmind_core::event::{DomainEvent, EventBus};
use vaultmind_core::retrieval::{FILE_PATH_KEY, VectorStore};
use walkdir::WalkDir;

use crate::splitter::MarkdownSplitter;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(#[\p{L}\p{N}_/-]*[\p{L}_/-][\p{L}\p{N}_/-]*)").expect("pattern is valid")
});

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\]|#]+)(?:[#|][^\]]*)?\]\]").expect("pattern is valid")
});

/// `#tags` in note text, in first-seen order, `#` included.
pub fn extract_tags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for cap in TAG_RE.captures_iter(text) {
        let tag = cap[1].to_string();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// `[[wiki links]]` targets in note text, in first-seen order. Aliases and
/// heading anchors are dropped.
pub fn extract_links(text: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for cap in LINK_RE.captures_iter(text) {
        let link = cap[1].trim().to_string();
        if !link.is_empty() && !links.contains(&link) {
            links.push(link);
        }
    }
    links
}

/// Splits notes under `root` into passages and stores them.
///
/// Passage ids are `"{file_name}_{index}"`; metadata carries `fileName`,
/// `filePath` (relative to `root`, `/`-separated) and, when present, `tags`
/// and `links`.
pub struct NoteIndexer {
    root: PathBuf,
    store: Arc<dyn VectorStore>,
    splitter: MarkdownSplitter,
    events: Option<Arc<EventBus>>,
}

impl NoteIndexer {
    pub fn new(root: impl Into<PathBuf>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            root: root.into(),
            store,
            splitter: MarkdownSplitter::default(),
            events: None,
        }
    }

    pub fn with_splitter(mut self, splitter: MarkdownSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Index every `*.md` file under the root, skipping hidden directories.
    /// Returns the number of passages stored.
    pub async fn index_all(&self) -> Result<usize, RetrievalError> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
            })
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable path");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("md")))
            .collect();
        files.sort();

        let mut total = 0;
        for (i, path) in files.iter().enumerate() {
            debug!(file = %path.display(), progress = i + 1, of = files.len(), "Embedding note");
            total += self.add_file(path).await?;
        }

        info!(files = files.len(), passages = total, "Indexed notes");
        if let Some(events) = &self.events {
            events.publish(DomainEvent::NotesIndexed {
                count: files.len(),
                timestamp: Utc::now(),
            });
        }
        Ok(total)
    }

    /// Split and store one note. Returns the number of passages stored.
    pub async fn add_file(&self, path: &Path) -> Result<usize, RetrievalError> {
        let absolute = self.absolute(path);
        let contents = tokio::fs::read_to_string(&absolute).await.map_err(|e| {
            RetrievalError::Storage(format!("failed to read {}: {e}", absolute.display()))
        })?;

        let file_name = absolute
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let metadata = self.metadata(&file_name, &self.relative_key(&absolute), &contents);

        let documents = self.splitter.create_documents(&contents, &file_name, &metadata);
        let ids: Vec<String> = (0..documents.len())
            .map(|index| format!("{file_name}_{index}"))
            .collect();
        let count = documents.len();

        self.store.add_documents(documents, Some(ids)).await?;
        debug!(file = %file_name, passages = count, "Embedded note");
        Ok(count)
    }

    /// Re-index a changed note: drop its passages, then add it again.
    pub async fn update_file(&self, path: &Path) -> Result<usize, RetrievalError> {
        self.delete_file(path).await?;
        self.add_file(path).await
    }

    /// Move a note's passages from `old` to `new`.
    pub async fn rename_file(&self, old: &Path, new: &Path) -> Result<usize, RetrievalError> {
        self.delete_file(old).await?;
        self.add_file(new).await
    }

    /// Drop a note's passages. Returns how many were removed.
    pub async fn delete_file(&self, path: &Path) -> Result<usize, RetrievalError> {
        let key = self.relative_key(&self.absolute(path));
        self.store.delete_documents_for_file(&key).await
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn relative_key(&self, absolute: &Path) -> String {
        let relative = absolute.strip_prefix(&self.root).unwrap_or(absolute);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn metadata(&self, file_name: &str, file_path: &str, contents: &str) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("fileName".into(), json!(file_name));
        metadata.insert(FILE_PATH_KEY.into(), json!(file_path));

        let tags = extract_tags(contents);
        if !tags.is_empty() {
            metadata.insert("tags".into(), json!(tags));
        }
        let links = extract_links(contents);
        if !links.is_empty() {
            metadata.insert("links".into(), json!(links));
        }
        metadata
    }
}

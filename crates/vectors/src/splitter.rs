//! Markdown-aware recursive text splitter.
//!
//! Text is split on the coarsest separator present (headings, then rules and
//! paragraphs, then lines, then words, then characters) and the pieces are
//! merged back into chunks of at most `chunk_size` characters, with up to
//! `chunk_overlap` characters carried over between neighbours.

use serde_json::{Map, Value};
use vaultmind_core::retrieval::Document;

/// Separators tried in order. Each is kept at the start of the piece that
/// follows it.
const MARKDOWN_SEPARATORS: &[&str] = &[
    "\n## ",
    "\n### ",
    "\n#### ",
    "\n##### ",
    "\n###### ",
    "```\n\n",
    "\n\n***\n\n",
    "\n\n---\n\n",
    "\n\n___\n\n",
    "\n\n",
    "\n",
    " ",
    "",
];

/// Marks a chunk that starts inside the previous chunk's text.
const OVERLAP_HEADER: &str = "(cont'd) ";

#[derive(Debug, Clone)]
pub struct MarkdownSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for MarkdownSplitter {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 20,
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl MarkdownSplitter {
    /// `chunk_overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    /// Split `text` into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, MARKDOWN_SEPARATORS)
    }

    /// Split a note into documents. Each chunk is prefixed with the
    /// `DOCUMENT NAME` header and carries a copy of `metadata`.
    pub fn create_documents(
        &self,
        text: &str,
        file_name: &str,
        metadata: &Map<String, Value>,
    ) -> Vec<Document> {
        let header = format!("DOCUMENT NAME: {file_name}\n\n---\n\n");
        let mut search_from = 0usize;
        let mut previous_end: Option<usize> = None;

        self.split_text(text)
            .into_iter()
            .map(|chunk| {
                let start = text[search_from..]
                    .find(&chunk)
                    .map(|offset| search_from + offset);
                let overlapping = match (start, previous_end) {
                    (Some(start), Some(end)) => start < end,
                    _ => false,
                };
                if let Some(start) = start {
                    previous_end = Some(start + chunk.len());
                    search_from = start + chunk.chars().next().map_or(0, char::len_utf8);
                }

                let mut content = header.clone();
                if overlapping {
                    content.push_str(OVERLAP_HEADER);
                }
                content.push_str(&chunk);

                Document {
                    content,
                    metadata: metadata.clone(),
                    id: None,
                }
            })
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let Some(position) = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s))
        else {
            return vec![text.to_string()];
        };
        let separator = separators[position];
        let finer = &separators[position + 1..];

        let mut chunks = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.trim().to_string());
            } else {
                chunks.extend(self.split_recursive(&piece, finer));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }
        chunks.retain(|c| !c.is_empty());
        chunks
    }

    /// Greedily merge small pieces into chunks, keeping a tail of up to
    /// `chunk_overlap` characters from one chunk at the head of the next.
    fn merge(&self, pieces: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: std::collections::VecDeque<&str> = std::collections::VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                let chunk: String = window.iter().copied().collect();
                let chunk = chunk.trim();
                if !chunk.is_empty() {
                    chunks.push(chunk.to_string());
                }
                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }

        let chunk: String = window.iter().copied().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        chunks
    }
}

/// Split on `separator`, keeping it at the start of each following piece.
/// An empty separator splits into characters.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in text.match_indices(separator) {
        if index > start {
            pieces.push(text[start..index].to_string());
        }
        start = index;
    }
    if start < text.len() {
        pieces.push(text[start..].to_string());
    }
    pieces.retain(|p| !p.is_empty());
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn short_text_is_one_chunk() {
        let splitter = MarkdownSplitter::default();
        assert_eq!(splitter.split_text("  # Title\n\nHello.  "), vec!["# Title\n\nHello."]);
    }

    #[test]
    fn chunks_respect_size() {
        let splitter = MarkdownSplitter::new(50, 10);
        let text = "word ".repeat(100);
        let chunks = splitter.split_text(&text);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 50));
    }

    #[test]
    fn headings_split_before_paragraphs() {
        let splitter = MarkdownSplitter::new(40, 0);
        let text = "# Trip\nintro line here\n## Day one\nLouvre and lunch\n## Day two\nVersailles";
        let chunks = splitter.split_text(text);
        assert!(chunks.iter().any(|c| c.starts_with("## Day one")));
        assert!(chunks.iter().any(|c| c.starts_with("## Day two")));
    }

    #[test]
    fn overlap_carries_words_forward() {
        let splitter = MarkdownSplitter::new(20, 8);
        let chunks = splitter.split_text("alpha beta gamma delta epsilon zeta eta theta");
        assert!(chunks.len() >= 2);
        let first_last_word = chunks[0].split_whitespace().last().unwrap();
        assert!(chunks[1].starts_with(first_last_word));
    }

    #[test]
    fn documents_carry_header_and_metadata() {
        let splitter = MarkdownSplitter::new(20, 8);
        let mut metadata = Map::new();
        metadata.insert("filePath".into(), json!("travel/paris.md"));
        let docs = splitter.create_documents(
            "alpha beta gamma delta epsilon zeta eta theta",
            "paris.md",
            &metadata,
        );
        assert!(docs.len() >= 2);
        assert!(docs[0].content.starts_with("DOCUMENT NAME: paris.md\n\n---\n\nalpha"));
        assert!(docs[1].content.contains("(cont'd) "));
        assert!(docs.iter().all(|d| d.file_path() == Some("travel/paris.md")));
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let splitter = MarkdownSplitter::new(5, 2);
        let chunks = splitter.split_text("héllo wörld ñandú çava");
        assert!(!chunks.is_empty());
    }

    #[test]
    fn separator_stays_with_following_piece() {
        let pieces = split_keeping_separator("a\n\nb\n\nc", "\n\n");
        assert_eq!(pieces, vec!["a", "\n\nb", "\n\nc"]);
    }
}

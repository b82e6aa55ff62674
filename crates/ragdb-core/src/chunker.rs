//! Recursive character splitter turning loaded documents into `Chunk`s.
//!
//! Text is cut on the largest boundary that occurs in it (paragraph, line,
//! word, then single characters) and the pieces are greedily merged back into
//! windows of at most `chunk_size` characters, carrying up to `chunk_overlap`
//! characters from the end of one window into the start of the next.
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{is_reserved, Chunk, LoadedDocument, Metadata};

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks; must be below `chunk_size`.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split every document and wrap each window in a `Chunk`.
    ///
    /// `index` runs across the whole output, not per input document.
    pub fn split(&self, documents: &[LoadedDocument], source: &str, type_tag: &str) -> Vec<Chunk> {
        let doc_type = type_tag.trim_start_matches('.').to_ascii_lowercase();
        let mut chunks = Vec::new();
        for doc in documents {
            let metadata: Metadata = doc
                .metadata
                .iter()
                .filter(|(k, _)| !is_reserved(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            for text in self.split_text(&doc.text) {
                chunks.push(Chunk {
                    chunk_id: Uuid::new_v4().simple().to_string(),
                    text,
                    source: source.to_string(),
                    doc_type: doc_type.clone(),
                    index: chunks.len(),
                    metadata: metadata.clone(),
                });
            }
        }
        tracing::debug!("Split {} documents from {} into {} chunks", documents.len(), source, chunks.len());
        chunks
    }

    /// Split raw text into overlapping windows. Whitespace-only text yields nothing.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.config.chunk_size {
            return vec![text.to_string()];
        }
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, rest) = pick_separator(text, separators);
        let splits = split_keeping_separator(text, separator);

        let mut out = Vec::new();
        let mut good: Vec<String> = Vec::new();
        for piece in splits {
            if char_len(&piece) < self.config.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                out.extend(self.merge(&good));
                good.clear();
            }
            if rest.is_empty() {
                out.push(piece);
            } else {
                out.extend(self.split_recursive(&piece, rest));
            }
        }
        if !good.is_empty() {
            out.extend(self.merge(&good));
        }
        out
    }

    fn merge(&self, splits: &[String]) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in splits {
            let len = char_len(piece);
            if total + len > size {
                if total > size {
                    tracing::warn!("Created a chunk of size {}, which is longer than the specified {}", total, size);
                }
                if !current.is_empty() {
                    push_joined(&mut docs, &current);
                    while total > overlap || (total + len > size && total > 0) {
                        match current.pop_front() {
                            Some(front) => total -= char_len(front),
                            None => break,
                        }
                    }
                }
            }
            current.push_back(piece);
            total += len;
        }
        push_joined(&mut docs, &current);
        docs
    }
}

fn pick_separator<'a, 'b>(text: &str, separators: &'b [&'a str]) -> (&'a str, &'b [&'a str]) {
    for (i, &sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            return (sep, &[]);
        }
        if text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Split on `separator`, re-attaching it to the start of each following piece.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    let mut parts = text.split(separator);
    let mut out = Vec::new();
    if let Some(first) = parts.next() {
        out.push(first.to_string());
    }
    out.extend(parts.map(|p| format!("{separator}{p}")));
    out.retain(|s| !s.is_empty());
    out
}

fn push_joined(docs: &mut Vec<String>, current: &VecDeque<&str>) {
    let joined: String = current.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

//! Types for document segmentation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One page of extracted document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number as supplied by the extraction step
    pub page_number: u32,
    /// Raw page text
    pub text: String,
}

impl Page {
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
        }
    }
}

/// A retrievable unit of a document.
///
/// Chunks never span pages. `chunk_index` runs across the whole document,
/// starting at 0, and `chunk_id` is derived from `(document_id, chunk_index)`
/// so re-ingesting a document reproduces the same ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier, unique across the store
    pub chunk_id: String,
    /// Position of this chunk within its document (0-based)
    pub chunk_index: usize,
    /// Owning document
    pub document_id: String,
    /// Page this chunk was cut from
    pub page_number: u32,
    /// Sentences joined by single spaces
    pub content: String,
    /// Number of sentences in `content`, overlap sentences included
    pub sentence_count: usize,
}

/// Derives the deterministic id of a document's `chunk_index`-th chunk.
pub fn chunk_id_for(document_id: &str, chunk_index: usize) -> String {
    let mut name = Vec::with_capacity(document_id.len() + 9);
    name.extend_from_slice(document_id.as_bytes());
    name.push(0);
    name.extend_from_slice(&(chunk_index as u64).to_be_bytes());
    Uuid::new_v5(&Uuid::NAMESPACE_OID, &name).to_string()
}

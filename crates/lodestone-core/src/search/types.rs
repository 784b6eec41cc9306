//! Core types for similarity search.

use crate::chunking::Chunk;
use serde::{Deserialize, Serialize};

/// A stored chunk together with its embedding.
///
/// The embedding is kept out of the serialized form; stores persist it
/// separately as raw little-endian `f32` bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique key
    pub chunk_id: String,
    pub document_id: String,
    pub chunk_index: usize,
    pub page_number: u32,
    pub content: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

impl ChunkRecord {
    pub fn from_chunk(chunk: &Chunk, embedding: Vec<f32>) -> Self {
        Self {
            chunk_id: chunk.chunk_id.clone(),
            document_id: chunk.document_id.clone(),
            chunk_index: chunk.chunk_index,
            page_number: chunk.page_number,
            content: chunk.content.clone(),
            embedding,
        }
    }

    /// Returns true if the record belongs to one of `scope`'s documents, or
    /// if there is no scope.
    pub fn in_scope(&self, scope: Option<&[String]>) -> bool {
        scope.map_or(true, |ids| ids.iter().any(|id| *id == self.document_id))
    }
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_id: String,
    pub content: String,
    pub page_number: u32,
    pub document_id: String,
    pub similarity: f32,
}

/// Ranked hits plus how many candidates were scored in degraded mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    /// Candidates whose dimension differed from the query's
    pub degraded: usize,
    /// Candidates scored before thresholding
    pub candidates: usize,
}

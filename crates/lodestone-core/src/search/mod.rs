//! Similarity search over stored chunk embeddings.
//!
//! - [`similarity`] - cosine scoring with degraded fallback on dimension mismatch
//! - [`SimilarityIndex`] - brute-force ranking over a [`ChunkStore`](crate::storage::ChunkStore)
//! - [`types`] - records, hits and result sets

mod index;
pub mod similarity;
pub mod types;

pub use index::SimilarityIndex;
pub use similarity::{cosine_similarity, Similarity};
pub use types::{ChunkRecord, SearchHit, SearchResults};

//! Error types for lodestone-core.
//!
//! The retrieval pipeline distinguishes four failure families:
//!
//! - **Validation** errors fail fast (empty document, blank query, bad config,
//!   chunk/embedding count mismatch).
//! - **Dependency unavailable** errors ([`StrategyError`]) are recovered locally
//!   by moving on to the next embedding strategy.
//! - **Storage** errors ([`StoreError`]) are surfaced to the caller unchanged.
//! - Degraded similarity scores are not errors at all; they are logged and
//!   counted by the search layer.

use crate::storage::StoreError;
use thiserror::Error;

/// Errors raised while validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A field holds a value outside its accepted range
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    /// The configuration source could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Errors raised by a single embedding strategy.
///
/// Neither variant escapes the [`EmbeddingGenerator`](crate::embedding::EmbeddingGenerator);
/// both cause the next strategy in the list to be tried.
#[derive(Debug, Clone, Error)]
pub enum StrategyError {
    /// The strategy's dependency (model, vocabulary) is not available
    #[error("Strategy unavailable: {0}")]
    Unavailable(String),
    /// The strategy was available but failed at runtime
    #[error("Strategy failed: {0}")]
    Failed(String),
}

/// Errors that can occur on the embedding worker pool.
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    /// Worker thread could not be spawned
    #[error("Failed to spawn worker thread: {0}")]
    SpawnFailed(String),
    /// The pool no longer accepts or answers jobs
    #[error("Worker pool shut down")]
    ShutDown,
    /// The submitted job panicked
    #[error("Worker job panicked")]
    JobPanicked,
}

/// Errors returned by the [`RetrievalPipeline`](crate::processing::RetrievalPipeline).
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Segmentation produced no chunks for the document
    #[error("Document `{0}` has no content to index")]
    EmptyContent(String),
    /// Document id was blank
    #[error("Document id must not be empty")]
    EmptyDocumentId,
    /// Query text was blank
    #[error("Query must not be empty")]
    EmptyQuery,
    /// Number of embeddings does not match the number of chunks
    #[error("Chunk count mismatch: {chunks} chunks but {embeddings} embeddings")]
    ChunkCountMismatch { chunks: usize, embeddings: usize },
    /// Configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Every embedding strategy failed for non-empty input
    #[error("No embedding strategy could embed the input")]
    EmbeddingUnavailable,
    /// Persistence collaborator failed
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
    /// Worker pool failure
    #[error("Worker pool error: {0}")]
    Worker(#[from] WorkerError),
}

impl RetrievalError {
    /// Returns true for errors caused by the caller's input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RetrievalError::EmptyContent(_)
                | RetrievalError::EmptyDocumentId
                | RetrievalError::EmptyQuery
                | RetrievalError::ChunkCountMismatch { .. }
                | RetrievalError::Config(_)
        )
    }
}

//! Chunk persistence.
//!
//! The [`ChunkStore`] trait is the persistence collaborator behind the
//! similarity index: one record per chunk id, upserted idempotently, fetched
//! in insertion order, deleted per document.
//!
//! # Implementations
//!
//! - [`InMemoryChunkStore`] - Process-local storage for tests and ephemeral use
//! - [`RedbChunkStore`] - Embedded on-disk database (feature `redb-store`)

mod chunk_store;

#[cfg(feature = "redb-store")]
mod redb_store;

pub use chunk_store::{ChunkStore, InMemoryChunkStore, StoreError};

#[cfg(feature = "redb-store")]
pub use redb_store::RedbChunkStore;

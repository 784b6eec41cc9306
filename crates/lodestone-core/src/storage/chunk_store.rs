//! Chunk store trait and in-memory implementation.
//!
//! A [`ChunkStore`] persists one [`ChunkRecord`] per chunk id. Stores keep
//! insertion order (a replaced record keeps its original slot) so that
//! ranking ties resolve the same way on every query, and expose a corpus
//! version that changes on every mutation.

use crate::search::types::ChunkRecord;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use thiserror::Error;

/// Errors that can occur during chunk store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A stored record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The backing database failed, or an in-memory lock was poisoned
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Persistence collaborator for chunk records.
///
/// # Design Notes
///
/// - `upsert` is keyed by `chunk_id` and idempotent.
/// - `fetch_all` returns records in insertion order, optionally filtered to a
///   set of document ids.
/// - No transaction primitives are exposed; each call is self-contained.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Inserts or replaces the record with the same `chunk_id`.
    async fn upsert(&self, record: ChunkRecord) -> Result<(), StoreError>;

    /// Returns every record, or only those whose document is in `scope`.
    async fn fetch_all(&self, scope: Option<&[String]>) -> Result<Vec<ChunkRecord>, StoreError>;

    /// Returns one document's records ordered by `chunk_index`.
    async fn document_chunks(&self, document_id: &str) -> Result<Vec<ChunkRecord>, StoreError> {
        let scope = [document_id.to_string()];
        let mut records = self.fetch_all(Some(&scope)).await?;
        records.sort_by_key(|r| r.chunk_index);
        Ok(records)
    }

    /// Returns the chunk ids currently stored for a document.
    async fn chunk_ids_for_document(&self, document_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .document_chunks(document_id)
            .await?
            .into_iter()
            .map(|r| r.chunk_id)
            .collect())
    }

    /// Deletes one record. Returns whether it existed.
    async fn delete_chunk(&self, chunk_id: &str) -> Result<bool, StoreError>;

    /// Deletes every record of a document. Returns how many were removed.
    async fn delete_document(&self, document_id: &str) -> Result<usize, StoreError>;

    /// Distinct document ids, sorted.
    async fn document_ids(&self) -> Result<Vec<String>, StoreError>;

    async fn chunk_count(&self) -> Result<usize, StoreError>;

    /// Monotonic counter bumped by every mutation.
    async fn corpus_version(&self) -> Result<u64, StoreError>;
}

#[derive(Default)]
struct MemoryState {
    /// Insertion sequence -> record
    records: BTreeMap<u64, ChunkRecord>,
    /// chunk_id -> insertion sequence
    slots: HashMap<String, u64>,
    next_seq: u64,
    version: u64,
}

/// In-memory chunk store for tests and ephemeral pipelines.
#[derive(Default)]
pub struct InMemoryChunkStore {
    state: RwLock<MemoryState>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(e: impl std::fmt::Display) -> StoreError {
    StoreError::DatabaseError(format!("Lock poisoned: {}", e))
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn upsert(&self, record: ChunkRecord) -> Result<(), StoreError> {
        let mut guard = self.state.write().map_err(poisoned)?;
        let state = &mut *guard;
        let seq = match state.slots.get(&record.chunk_id).copied() {
            Some(seq) => seq,
            None => {
                let seq = state.next_seq;
                state.next_seq += 1;
                state.slots.insert(record.chunk_id.clone(), seq);
                seq
            }
        };
        state.records.insert(seq, record);
        state.version += 1;
        Ok(())
    }

    async fn fetch_all(&self, scope: Option<&[String]>) -> Result<Vec<ChunkRecord>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .records
            .values()
            .filter(|r| r.in_scope(scope))
            .cloned()
            .collect())
    }

    async fn delete_chunk(&self, chunk_id: &str) -> Result<bool, StoreError> {
        let mut guard = self.state.write().map_err(poisoned)?;
        let state = &mut *guard;
        match state.slots.remove(chunk_id) {
            Some(seq) => {
                state.records.remove(&seq);
                state.version += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_document(&self, document_id: &str) -> Result<usize, StoreError> {
        let mut guard = self.state.write().map_err(poisoned)?;
        let state = &mut *guard;
        let doomed: Vec<(u64, String)> = state
            .records
            .iter()
            .filter(|(_, r)| r.document_id == document_id)
            .map(|(seq, r)| (*seq, r.chunk_id.clone()))
            .collect();

        for (seq, chunk_id) in &doomed {
            state.records.remove(seq);
            state.slots.remove(chunk_id);
        }
        if !doomed.is_empty() {
            state.version += 1;
        }
        Ok(doomed.len())
    }

    async fn document_ids(&self) -> Result<Vec<String>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        let mut ids: Vec<String> = state
            .records
            .values()
            .map(|r| r.document_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn chunk_count(&self) -> Result<usize, StoreError> {
        Ok(self.state.read().map_err(poisoned)?.records.len())
    }

    async fn corpus_version(&self) -> Result<u64, StoreError> {
        Ok(self.state.read().map_err(poisoned)?.version)
    }
}

// Blanket implementation for Arc<T> so a store can be shared between a
// pipeline and other readers.
#[async_trait]
impl<T: ChunkStore + ?Sized> ChunkStore for std::sync::Arc<T> {
    async fn upsert(&self, record: ChunkRecord) -> Result<(), StoreError> {
        (**self).upsert(record).await
    }

    async fn fetch_all(&self, scope: Option<&[String]>) -> Result<Vec<ChunkRecord>, StoreError> {
        (**self).fetch_all(scope).await
    }

    async fn document_chunks(&self, document_id: &str) -> Result<Vec<ChunkRecord>, StoreError> {
        (**self).document_chunks(document_id).await
    }

    async fn chunk_ids_for_document(&self, document_id: &str) -> Result<Vec<String>, StoreError> {
        (**self).chunk_ids_for_document(document_id).await
    }

    async fn delete_chunk(&self, chunk_id: &str) -> Result<bool, StoreError> {
        (**self).delete_chunk(chunk_id).await
    }

    async fn delete_document(&self, document_id: &str) -> Result<usize, StoreError> {
        (**self).delete_document(document_id).await
    }

    async fn document_ids(&self) -> Result<Vec<String>, StoreError> {
        (**self).document_ids().await
    }

    async fn chunk_count(&self) -> Result<usize, StoreError> {
        (**self).chunk_count().await
    }

    async fn corpus_version(&self) -> Result<u64, StoreError> {
        (**self).corpus_version().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(chunk_id: &str, document_id: &str, chunk_index: usize, content: &str) -> ChunkRecord {
        ChunkRecord {
            chunk_id: chunk_id.into(),
            document_id: document_id.into(),
            chunk_index,
            page_number: 1,
            content: content.into(),
            embedding: vec![1.0, 0.0],
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = InMemoryChunkStore::new();
        store.upsert(record("c1", "d1", 0, "first")).await.unwrap();
        store.upsert(record("c1", "d1", 0, "first")).await.unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replacement_keeps_insertion_slot() {
        let store = InMemoryChunkStore::new();
        store.upsert(record("c1", "d1", 0, "old")).await.unwrap();
        store.upsert(record("c2", "d1", 1, "second")).await.unwrap();
        store.upsert(record("c1", "d1", 0, "new")).await.unwrap();

        let all = store.fetch_all(None).await.unwrap();
        let contents: Vec<&str> = all.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["new", "second"]);
    }

    #[tokio::test]
    async fn test_scope_and_document_operations() {
        let store = InMemoryChunkStore::new();
        store.upsert(record("a1", "a", 1, "a one")).await.unwrap();
        store.upsert(record("a0", "a", 0, "a zero")).await.unwrap();
        store.upsert(record("b0", "b", 0, "b zero")).await.unwrap();

        let scope = vec!["b".to_string()];
        assert_eq!(store.fetch_all(Some(&scope)).await.unwrap().len(), 1);

        let chunks = store.document_chunks("a").await.unwrap();
        assert_eq!(chunks[0].chunk_id, "a0");
        assert_eq!(chunks[1].chunk_id, "a1");
        assert_eq!(
            store.chunk_ids_for_document("a").await.unwrap(),
            vec!["a0", "a1"]
        );
        assert_eq!(store.document_ids().await.unwrap(), vec!["a", "b"]);

        assert_eq!(store.delete_document("a").await.unwrap(), 2);
        assert_eq!(store.document_ids().await.unwrap(), vec!["b"]);
        assert_eq!(store.delete_document("a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_version_bumps_on_mutation() {
        let store = InMemoryChunkStore::new();
        let v0 = store.corpus_version().await.unwrap();
        store.upsert(record("c1", "d1", 0, "x")).await.unwrap();
        let v1 = store.corpus_version().await.unwrap();
        assert!(v1 > v0);

        assert!(store.delete_chunk("c1").await.unwrap());
        assert!(store.corpus_version().await.unwrap() > v1);
        assert!(!store.delete_chunk("c1").await.unwrap());
    }

    #[tokio::test]
    async fn test_arc_store() {
        let store = Arc::new(InMemoryChunkStore::new());
        store.upsert(record("c1", "d1", 0, "x")).await.unwrap();
        let shared: Arc<InMemoryChunkStore> = store.clone();
        assert_eq!(ChunkStore::chunk_count(&shared).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_poisoned_lock_is_database_error() {
        let store = Arc::new(InMemoryChunkStore::new());
        let writer = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = writer.state.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        let err = store.chunk_count().await.unwrap_err();
        assert!(matches!(err, StoreError::DatabaseError(_)));
        assert!(err.to_string().starts_with("Database error: Lock poisoned"));
    }
}

//! Redb-backed chunk store.
//!
//! Uses [redb](https://github.com/cberner/redb) - a pure Rust, ACID-compliant,
//! embedded B-tree database.
//!
//! # Tables
//!
//! - `chunks`: slot (u64) -> ChunkRecord (JSON, without embedding)
//! - `embeddings`: slot (u64) -> `Vec<f32>` (raw bytes, little-endian)
//! - `chunk_slots`: chunk_id (string) -> slot (u64)
//! - `metadata`: key (string) -> counter (u64)
//!
//! Slots are allocated from a monotonic counter, so iterating `chunks` yields
//! records in insertion order. A replaced chunk keeps its slot.

use super::{ChunkStore, StoreError};
use crate::search::types::ChunkRecord;
use async_trait::async_trait;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const CHUNKS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("chunks");
const EMBEDDINGS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("embeddings");
const CHUNK_SLOTS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("chunk_slots");
const METADATA_TABLE: TableDefinition<&str, u64> = TableDefinition::new("metadata");

// Metadata keys
const NEXT_SLOT_KEY: &str = "next_slot";
const CORPUS_VERSION_KEY: &str = "corpus_version";

fn db_error<E: Display>(context: &'static str) -> impl FnOnce(E) -> StoreError {
    move |e| StoreError::DatabaseError(format!("{}: {}", context, e))
}

/// Redb-backed chunk store for persistent indexes.
///
/// # Example
///
/// ```ignore
/// use lodestone_core::storage::{ChunkStore, RedbChunkStore};
///
/// let store = RedbChunkStore::open("./data/chunks.redb")?;
/// store.upsert(record).await?;
/// ```
pub struct RedbChunkStore {
    db: Arc<Database>,
}

impl RedbChunkStore {
    /// Opens or creates a redb database at the given path.
    ///
    /// Creates the database file and all required tables if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(db_error("Failed to open database"))?;

        {
            let write_txn = db
                .begin_write()
                .map_err(db_error("Failed to begin write transaction"))?;
            write_txn
                .open_table(CHUNKS_TABLE)
                .map_err(db_error("Failed to create chunks table"))?;
            write_txn
                .open_table(EMBEDDINGS_TABLE)
                .map_err(db_error("Failed to create embeddings table"))?;
            write_txn
                .open_table(CHUNK_SLOTS_TABLE)
                .map_err(db_error("Failed to create chunk_slots table"))?;
            write_txn
                .open_table(METADATA_TABLE)
                .map_err(db_error("Failed to create metadata table"))?;
            write_txn
                .commit()
                .map_err(db_error("Failed to commit table creation"))?;
        }

        debug!(path = %path.as_ref().display(), "Opened redb chunk store");
        Ok(Self { db: Arc::new(db) })
    }

    fn serialize_record(record: &ChunkRecord) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(record).map_err(|e| {
            StoreError::SerializationError(format!("Failed to serialize chunk: {}", e))
        })
    }

    fn deserialize_record(bytes: &[u8]) -> Result<ChunkRecord, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| {
            StoreError::SerializationError(format!("Failed to deserialize chunk: {}", e))
        })
    }

    /// Serializes an embedding to raw bytes.
    ///
    /// Format: Little-endian f32 values packed sequentially (4 bytes per value).
    /// Endianness MUST match `deserialize_embedding()`.
    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(embedding.len() * 4);
        for &val in embedding {
            bytes.extend_from_slice(&val.to_le_bytes());
        }
        bytes
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn counter<T: ReadableTable<&'static str, u64>>(
        table: &T,
        key: &str,
    ) -> Result<u64, StoreError> {
        Ok(table
            .get(key)
            .map_err(db_error("Failed to read metadata"))?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    fn bump_version(table: &mut redb::Table<&'static str, u64>) -> Result<(), StoreError> {
        let version = Self::counter(table, CORPUS_VERSION_KEY)?;
        table
            .insert(CORPUS_VERSION_KEY, version + 1)
            .map_err(db_error("Failed to update corpus version"))?;
        Ok(())
    }
}

#[async_trait]
impl ChunkStore for RedbChunkStore {
    async fn upsert(&self, record: ChunkRecord) -> Result<(), StoreError> {
        let bytes = Self::serialize_record(&record)?;
        let embedding = Self::serialize_embedding(&record.embedding);

        let write_txn = self
            .db
            .begin_write()
            .map_err(db_error("Failed to begin write transaction"))?;
        {
            let mut slots = write_txn
                .open_table(CHUNK_SLOTS_TABLE)
                .map_err(db_error("Failed to open chunk_slots table"))?;
            let mut metadata = write_txn
                .open_table(METADATA_TABLE)
                .map_err(db_error("Failed to open metadata table"))?;
            let mut chunks = write_txn
                .open_table(CHUNKS_TABLE)
                .map_err(db_error("Failed to open chunks table"))?;
            let mut embeddings = write_txn
                .open_table(EMBEDDINGS_TABLE)
                .map_err(db_error("Failed to open embeddings table"))?;

            let existing = slots
                .get(record.chunk_id.as_str())
                .map_err(db_error("Failed to read chunk slot"))?
                .map(|guard| guard.value());
            let slot = match existing {
                Some(slot) => slot,
                None => {
                    let slot = Self::counter(&metadata, NEXT_SLOT_KEY)?;
                    metadata
                        .insert(NEXT_SLOT_KEY, slot + 1)
                        .map_err(db_error("Failed to advance slot counter"))?;
                    slots
                        .insert(record.chunk_id.as_str(), slot)
                        .map_err(db_error("Failed to insert chunk slot"))?;
                    slot
                }
            };

            chunks
                .insert(slot, bytes.as_slice())
                .map_err(db_error("Failed to insert chunk"))?;
            embeddings
                .insert(slot, embedding.as_slice())
                .map_err(db_error("Failed to insert embedding"))?;
            Self::bump_version(&mut metadata)?;
        }
        write_txn
            .commit()
            .map_err(db_error("Failed to commit chunk"))?;

        Ok(())
    }

    async fn fetch_all(&self, scope: Option<&[String]>) -> Result<Vec<ChunkRecord>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(db_error("Failed to begin read transaction"))?;
        let chunks = read_txn
            .open_table(CHUNKS_TABLE)
            .map_err(db_error("Failed to open chunks table"))?;
        let embeddings = read_txn
            .open_table(EMBEDDINGS_TABLE)
            .map_err(db_error("Failed to open embeddings table"))?;

        let mut records = Vec::new();
        let iter = chunks
            .iter()
            .map_err(db_error("Failed to iterate chunks"))?;
        for entry in iter {
            let (slot, value) = entry.map_err(db_error("Failed to read chunk entry"))?;
            let mut record = Self::deserialize_record(value.value())?;
            if !record.in_scope(scope) {
                continue;
            }
            if let Some(guard) = embeddings
                .get(slot.value())
                .map_err(db_error("Failed to get embedding"))?
            {
                record.embedding = Self::deserialize_embedding(guard.value());
            }
            records.push(record);
        }

        Ok(records)
    }

    async fn delete_chunk(&self, chunk_id: &str) -> Result<bool, StoreError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(db_error("Failed to begin write transaction"))?;
        let removed = {
            let mut slots = write_txn
                .open_table(CHUNK_SLOTS_TABLE)
                .map_err(db_error("Failed to open chunk_slots table"))?;
            let slot = slots
                .remove(chunk_id)
                .map_err(db_error("Failed to delete chunk slot"))?
                .map(|guard| guard.value());

            match slot {
                Some(slot) => {
                    let mut chunks = write_txn
                        .open_table(CHUNKS_TABLE)
                        .map_err(db_error("Failed to open chunks table"))?;
                    let mut embeddings = write_txn
                        .open_table(EMBEDDINGS_TABLE)
                        .map_err(db_error("Failed to open embeddings table"))?;
                    let mut metadata = write_txn
                        .open_table(METADATA_TABLE)
                        .map_err(db_error("Failed to open metadata table"))?;
                    chunks
                        .remove(slot)
                        .map_err(db_error("Failed to delete chunk"))?;
                    embeddings
                        .remove(slot)
                        .map_err(db_error("Failed to delete embedding"))?;
                    Self::bump_version(&mut metadata)?;
                    true
                }
                None => false,
            }
        };
        write_txn
            .commit()
            .map_err(db_error("Failed to commit chunk deletion"))?;

        Ok(removed)
    }

    async fn delete_document(&self, document_id: &str) -> Result<usize, StoreError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(db_error("Failed to begin write transaction"))?;
        let removed = {
            let mut chunks = write_txn
                .open_table(CHUNKS_TABLE)
                .map_err(db_error("Failed to open chunks table"))?;
            let mut embeddings = write_txn
                .open_table(EMBEDDINGS_TABLE)
                .map_err(db_error("Failed to open embeddings table"))?;
            let mut slots = write_txn
                .open_table(CHUNK_SLOTS_TABLE)
                .map_err(db_error("Failed to open chunk_slots table"))?;
            let mut metadata = write_txn
                .open_table(METADATA_TABLE)
                .map_err(db_error("Failed to open metadata table"))?;

            let mut doomed: Vec<(u64, String)> = Vec::new();
            for entry in chunks
                .iter()
                .map_err(db_error("Failed to iterate chunks"))?
            {
                let (slot, value) = entry.map_err(db_error("Failed to read chunk entry"))?;
                let record = Self::deserialize_record(value.value())?;
                if record.document_id == document_id {
                    doomed.push((slot.value(), record.chunk_id));
                }
            }

            for (slot, chunk_id) in &doomed {
                chunks
                    .remove(*slot)
                    .map_err(db_error("Failed to delete chunk"))?;
                embeddings
                    .remove(*slot)
                    .map_err(db_error("Failed to delete embedding"))?;
                slots
                    .remove(chunk_id.as_str())
                    .map_err(db_error("Failed to delete chunk slot"))?;
            }
            if !doomed.is_empty() {
                Self::bump_version(&mut metadata)?;
            }
            doomed.len()
        };
        write_txn
            .commit()
            .map_err(db_error("Failed to commit document deletion"))?;

        Ok(removed)
    }

    async fn document_ids(&self) -> Result<Vec<String>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(db_error("Failed to begin read transaction"))?;
        let chunks = read_txn
            .open_table(CHUNKS_TABLE)
            .map_err(db_error("Failed to open chunks table"))?;

        let mut ids = BTreeSet::new();
        for entry in chunks
            .iter()
            .map_err(db_error("Failed to iterate chunks"))?
        {
            let (_, value) = entry.map_err(db_error("Failed to read chunk entry"))?;
            ids.insert(Self::deserialize_record(value.value())?.document_id);
        }
        Ok(ids.into_iter().collect())
    }

    async fn chunk_count(&self) -> Result<usize, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(db_error("Failed to begin read transaction"))?;
        let chunks = read_txn
            .open_table(CHUNKS_TABLE)
            .map_err(db_error("Failed to open chunks table"))?;
        let len = chunks.len().map_err(db_error("Failed to count chunks"))?;
        Ok(len as usize)
    }

    async fn corpus_version(&self) -> Result<u64, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(db_error("Failed to begin read transaction"))?;
        let metadata = read_txn
            .open_table(METADATA_TABLE)
            .map_err(db_error("Failed to open metadata table"))?;
        Self::counter(&metadata, CORPUS_VERSION_KEY)
    }
}

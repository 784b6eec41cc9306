//! Brute-force similarity index over a [`ChunkStore`].
//!
//! Every candidate is scored against the query (O(N·D)); hits at or above the
//! threshold are sorted by descending similarity with ties kept in storage
//! order, then truncated to the limit.

use super::similarity::score;
use super::types::{ChunkRecord, SearchHit, SearchResults};
use crate::chunking::Chunk;
use crate::config::DEGRADED_SIMILARITY;
use crate::metrics::global_metrics;
use crate::storage::{ChunkStore, StoreError};
use instant::Instant;
use tracing::{debug, info, instrument};

pub struct SimilarityIndex<S> {
    store: S,
    degraded_score: f32,
}

impl<S: ChunkStore> SimilarityIndex<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            degraded_score: DEGRADED_SIMILARITY,
        }
    }

    /// Overrides the score given to dimension-mismatched candidates.
    pub fn with_degraded_score(mut self, degraded_score: f32) -> Self {
        self.degraded_score = degraded_score;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stores or replaces a chunk's record.
    pub async fn upsert(&self, chunk: &Chunk, embedding: Vec<f32>) -> Result<(), StoreError> {
        self.store
            .upsert(ChunkRecord::from_chunk(chunk, embedding))
            .await
    }

    /// All stored records, optionally limited to `scope`'s documents.
    pub async fn candidates(&self, scope: Option<&[String]>) -> Result<Vec<ChunkRecord>, StoreError> {
        self.store.fetch_all(scope).await
    }

    /// Fetches candidates and ranks them against `query`.
    pub async fn search(
        &self,
        query: &[f32],
        scope: Option<&[String]>,
        limit: usize,
        threshold: f32,
    ) -> Result<SearchResults, StoreError> {
        let records = self.candidates(scope).await?;
        Ok(self.rank(&records, query, limit, threshold))
    }

    /// Ranks already fetched records against `query`.
    #[instrument(skip_all, fields(candidates = records.len(), limit = limit, threshold = threshold))]
    pub fn rank(
        &self,
        records: &[ChunkRecord],
        query: &[f32],
        limit: usize,
        threshold: f32,
    ) -> SearchResults {
        let start = Instant::now();
        let mut degraded = 0;

        let mut hits: Vec<SearchHit> = records
            .iter()
            .filter_map(|record| {
                let similarity = score(&record.embedding, query, self.degraded_score);
                if similarity.is_degraded() {
                    degraded += 1;
                }
                let value = similarity.value();
                (value >= threshold).then(|| SearchHit {
                    chunk_id: record.chunk_id.clone(),
                    content: record.content.clone(),
                    page_number: record.page_number,
                    document_id: record.document_id.clone(),
                    similarity: value,
                })
            })
            .collect();

        // sort_by is stable: equal scores keep storage order.
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(limit);

        if degraded > 0 {
            debug!(
                degraded,
                query_dimension = query.len(),
                "Dimension mismatch, degraded similarity used"
            );
            global_metrics().record_degraded(degraded);
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            hits = hits.len(),
            candidates = records.len(),
            degraded,
            top_score = hits.first().map(|h| h.similarity),
            elapsed_ms,
            "search-completed"
        );
        global_metrics().record_search(elapsed_ms, hits.len(), hits.first().map(|h| h.similarity));

        SearchResults {
            hits,
            degraded,
            candidates: records.len(),
        }
    }

    /// Deletes every chunk of a document.
    pub async fn delete_document(&self, document_id: &str) -> Result<usize, StoreError> {
        self.store.delete_document(document_id).await
    }

    pub async fn document_ids(&self) -> Result<Vec<String>, StoreError> {
        self.store.document_ids().await
    }

    pub async fn chunk_count(&self) -> Result<usize, StoreError> {
        self.store.chunk_count().await
    }

    pub async fn corpus_version(&self) -> Result<u64, StoreError> {
        self.store.corpus_version().await
    }
}

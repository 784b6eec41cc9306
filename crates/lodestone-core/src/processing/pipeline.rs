//! Retrieval pipeline.
//!
//! The `RetrievalPipeline` coordinates segmentation, embedding and similarity
//! search. Ingestion flows Segmenter → EmbeddingGenerator (batch) →
//! SimilarityIndex; answering flows EmbeddingGenerator (query) →
//! SimilarityIndex ranking. Embedding work runs on the [`WorkerPool`].

use crate::chunking::{Page, Segmenter};
use crate::config::{QuerySpace, RetrievalConfig};
use crate::embedding::{EmbeddingGenerator, EmbeddingSpace, QueryEmbedding, StrategyKind};
use crate::error::RetrievalError;
use crate::search::{ChunkRecord, SearchHit, SimilarityIndex};
use crate::storage::ChunkStore;
use crate::workers::{PoolStats, WorkerPool};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

/// Outcome of ingesting one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    /// Number of chunks stored
    pub chunk_count: usize,
    /// Strategy that embedded the chunks
    pub strategy: StrategyKind,
    /// Dimension of the stored vectors
    pub dimension: usize,
    /// Chunks from an earlier ingestion that no longer exist
    pub pruned: usize,
}

/// Ranked context for a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Answer {
    pub hits: Vec<SearchHit>,
    /// True when at least one hit passed the threshold
    pub has_context: bool,
    /// Strategy that embedded the query; `None` if nothing was embedded
    pub strategy: Option<StrategyKind>,
    /// Candidates scored with the degraded fallback
    pub degraded: usize,
}

/// Cache key for fitted query spaces: corpus version plus sorted scope.
type SpaceKey = (u64, Option<Vec<String>>);

fn space_key(version: u64, scope: Option<&[String]>) -> SpaceKey {
    let scope = scope.map(|ids| {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();
        ids
    });
    (version, scope)
}

fn corpus_texts(records: &[ChunkRecord]) -> Vec<String> {
    records.iter().map(|r| r.content.clone()).collect()
}

/// Document retrieval pipeline.
///
/// # Thread Safety
///
/// The pipeline is `Send + Sync` when its store is. Queries may run
/// concurrently; ingestion of the same document id must not.
///
/// # Example
///
/// ```ignore
/// use lodestone_core::chunking::Page;
/// use lodestone_core::config::RetrievalConfig;
/// use lodestone_core::processing::RetrievalPipeline;
/// use lodestone_core::storage::InMemoryChunkStore;
///
/// let pipeline = RetrievalPipeline::new(InMemoryChunkStore::new(), RetrievalConfig::default())?;
/// pipeline
///     .ingest("doc-1", &[Page::new(1, "Cats are mammals. Dogs are mammals too.")])
///     .await?;
///
/// let answer = pipeline.ask("What are dogs?", None).await?;
/// assert!(answer.has_context);
/// ```
pub struct RetrievalPipeline<S> {
    segmenter: Segmenter,
    generator: Arc<EmbeddingGenerator>,
    index: SimilarityIndex<S>,
    workers: WorkerPool,
    config: RetrievalConfig,
    space_cache: Mutex<HashMap<SpaceKey, EmbeddingSpace>>,
}

impl<S: ChunkStore> RetrievalPipeline<S> {
    /// Creates a pipeline with the lexical strategies (TF-IDF, then word
    /// frequency).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the worker pool
    /// cannot be started.
    pub fn new(store: S, config: RetrievalConfig) -> Result<Self, RetrievalError> {
        let generator = EmbeddingGenerator::from_config(&config, None);
        Self::with_generator(store, config, generator)
    }

    /// Creates a pipeline with a caller-supplied strategy list.
    pub fn with_generator(
        store: S,
        config: RetrievalConfig,
        generator: EmbeddingGenerator,
    ) -> Result<Self, RetrievalError> {
        config.validate()?;
        let segmenter = Segmenter::from_config(&config)?;
        let workers = WorkerPool::new(config.worker_threads)?;
        let index = SimilarityIndex::new(store).with_degraded_score(config.degraded_score);

        info!(
            strategies = ?generator.strategies(),
            query_space = ?config.query_space,
            "Retrieval pipeline ready"
        );

        Ok(Self {
            segmenter,
            generator: Arc::new(generator),
            index,
            workers,
            config,
            space_cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn index(&self) -> &SimilarityIndex<S> {
        &self.index
    }

    pub fn worker_stats(&self) -> PoolStats {
        self.workers.stats()
    }

    /// Segments, embeds and stores a document.
    ///
    /// Re-ingesting the same document id replaces its chunks in place; chunks
    /// the new run no longer produces are pruned once every upsert succeeded.
    ///
    /// # Errors
    ///
    /// * `EmptyDocumentId` / `EmptyContent` - nothing to index
    /// * `EmbeddingUnavailable` - every embedding strategy failed
    /// * `ChunkCountMismatch` - the embedder returned the wrong number of vectors
    /// * `Storage` - the store failed; earlier upserts are not rolled back
    #[instrument(skip_all, fields(document_id = %document_id, pages = pages.len()))]
    pub async fn ingest(
        &self,
        document_id: &str,
        pages: &[Page],
    ) -> Result<IngestReport, RetrievalError> {
        if document_id.trim().is_empty() {
            return Err(RetrievalError::EmptyDocumentId);
        }

        let chunks = self.segmenter.segment(document_id, pages);
        if chunks.is_empty() {
            return Err(RetrievalError::EmptyContent(document_id.to_string()));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let generator = self.generator.clone();
        let batch = self
            .workers
            .run(move || generator.embed_batch(&texts))
            .await?;

        let strategy = batch.strategy.ok_or(RetrievalError::EmbeddingUnavailable)?;
        if batch.vectors.len() != chunks.len() {
            return Err(RetrievalError::ChunkCountMismatch {
                chunks: chunks.len(),
                embeddings: batch.vectors.len(),
            });
        }
        let dimension = batch.dimension();

        let previous = self.index.store().chunk_ids_for_document(document_id).await?;
        for (chunk, vector) in chunks.iter().zip(batch.vectors) {
            self.index.upsert(chunk, vector).await?;
        }

        let current: HashSet<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        let mut pruned = 0;
        for stale in previous.iter().filter(|id| !current.contains(id.as_str())) {
            if self.index.store().delete_chunk(stale).await? {
                pruned += 1;
            }
        }
        if pruned > 0 {
            debug!(pruned, "Pruned stale chunks from earlier ingestion");
        }

        info!(
            chunks = chunks.len(),
            strategy = %strategy,
            dimension,
            "document-ingested"
        );

        Ok(IngestReport {
            document_id: document_id.to_string(),
            chunk_count: chunks.len(),
            strategy,
            dimension,
            pruned,
        })
    }

    /// Finds the chunks most relevant to `query`.
    ///
    /// `scope` limits candidates to the given document ids. Hits are ordered by
    /// descending similarity, all at or above `threshold`, at most `limit`.
    ///
    /// # Errors
    ///
    /// * `EmptyQuery` - blank query text
    /// * `EmbeddingUnavailable` - candidates exist but no strategy could embed
    ///   the query
    /// * `Storage` - the store failed
    #[instrument(skip_all, fields(limit = limit, threshold = threshold))]
    pub async fn answer(
        &self,
        query: &str,
        scope: Option<&[String]>,
        limit: usize,
        threshold: f32,
    ) -> Result<Answer, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }

        // Read the version before the candidates so a cached space is never
        // tagged newer than the corpus it was fitted on.
        let version = match self.config.query_space {
            QuerySpace::Cached => Some(self.index.corpus_version().await?),
            QuerySpace::Refit => None,
        };

        let records = self.index.candidates(scope).await?;
        if records.is_empty() {
            debug!("No candidate chunks, answering without context");
            return Ok(Answer::default());
        }

        let embedded = match version {
            Some(version) => self.cached_query(query, scope, &records, version).await?,
            None => {
                let corpus = corpus_texts(&records);
                let query = query.to_string();
                let generator = self.generator.clone();
                self.workers
                    .run(move || generator.embed_query(&query, &corpus))
                    .await?
            }
        };
        let embedded = embedded.ok_or(RetrievalError::EmbeddingUnavailable)?;

        let results = self
            .index
            .rank(&records, &embedded.vector, limit, threshold);

        Ok(Answer {
            has_context: !results.hits.is_empty(),
            hits: results.hits,
            strategy: Some(embedded.strategy),
            degraded: results.degraded,
        })
    }

    /// [`answer`](Self::answer) with the configured limit and threshold.
    pub async fn ask(&self, query: &str, scope: Option<&[String]>) -> Result<Answer, RetrievalError> {
        self.answer(
            query,
            scope,
            self.config.default_limit,
            self.config.similarity_threshold,
        )
        .await
    }

    /// Removes every chunk of a document, returning how many were removed.
    #[instrument(skip(self))]
    pub async fn delete_document(&self, document_id: &str) -> Result<usize, RetrievalError> {
        let removed = self.index.delete_document(document_id).await?;
        info!(removed, "document-deleted");
        Ok(removed)
    }

    /// A document's stored chunks in chunk order.
    pub async fn document_chunks(&self, document_id: &str) -> Result<Vec<ChunkRecord>, RetrievalError> {
        Ok(self.index.store().document_chunks(document_id).await?)
    }

    pub async fn document_ids(&self) -> Result<Vec<String>, RetrievalError> {
        Ok(self.index.document_ids().await?)
    }

    pub async fn chunk_count(&self) -> Result<usize, RetrievalError> {
        Ok(self.index.chunk_count().await?)
    }

    /// Embeds the query in a space fitted on the corpus alone, reusing the fit
    /// until the corpus version changes.
    async fn cached_query(
        &self,
        query: &str,
        scope: Option<&[String]>,
        records: &[ChunkRecord],
        version: u64,
    ) -> Result<Option<QueryEmbedding>, RetrievalError> {
        let key = space_key(version, scope);
        let cached = self
            .space_cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(&key).cloned());

        let space = match cached {
            Some(space) => {
                debug!(version, "Reusing cached query space");
                space
            }
            None => {
                let corpus = corpus_texts(records);
                let generator = self.generator.clone();
                let fitted = self.workers.run(move || generator.fit_space(&corpus)).await?;
                let Some(space) = fitted else {
                    return Ok(None);
                };
                let space = space.with_corpus_version(version);
                if let Ok(mut cache) = self.space_cache.lock() {
                    cache.retain(|(v, _), _| *v == version);
                    cache.insert(key, space.clone());
                }
                space
            }
        };

        let query = query.to_string();
        let embedded = self
            .workers
            .run(move || {
                space.embed_one(&query).map(|vector| QueryEmbedding {
                    strategy: space.strategy(),
                    vector,
                })
            })
            .await?;

        match embedded {
            Ok(embedding) => Ok(Some(embedding)),
            Err(e) => {
                warn!("Cached query space could not embed the query: {}", e);
                Ok(None)
            }
        }
    }
}

//! Command implementations.
//!
//! Each command opens the on-disk chunk store, builds a pipeline over it and
//! runs one operation.

use crate::config;
use anyhow::{Context, Result};
use lodestone_core::config::RetrievalConfig;
use lodestone_core::processing::{Answer, IngestReport, RetrievalPipeline};
use lodestone_core::storage::RedbChunkStore;
use std::path::{Path, PathBuf};
use tracing::info;

/// A stored document and how many chunks it has.
#[derive(Debug, serde::Serialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub chunk_count: usize,
}

/// Opens the store in `data_dir` and builds a pipeline over it.
pub fn open_pipeline(
    data_dir: Option<&PathBuf>,
    retrieval: RetrievalConfig,
) -> Result<RetrievalPipeline<RedbChunkStore>> {
    let db_path = config::database_path(data_dir)?;
    info!("Opening database: {}", db_path.display());
    let store = RedbChunkStore::open(&db_path)
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
    RetrievalPipeline::new(store, retrieval).context("Failed to start retrieval pipeline")
}

/// Ingests a plain-text file as `document_id`.
pub async fn ingest(
    pipeline: &RetrievalPipeline<RedbChunkStore>,
    document_id: &str,
    file: &Path,
) -> Result<IngestReport> {
    let pages = config::read_pages(file)?;
    info!("Read {} page(s) from {}", pages.len(), file.display());
    pipeline
        .ingest(document_id, &pages)
        .await
        .with_context(|| format!("Failed to ingest {}", file.display()))
}

/// Answers `query`, optionally limited to `documents`.
pub async fn ask(
    pipeline: &RetrievalPipeline<RedbChunkStore>,
    query: &str,
    documents: &[String],
    limit: Option<usize>,
    threshold: Option<f32>,
) -> Result<Answer> {
    let scope = (!documents.is_empty()).then_some(documents);
    let retrieval = pipeline.config();
    pipeline
        .answer(
            query,
            scope,
            limit.unwrap_or(retrieval.default_limit),
            threshold.unwrap_or(retrieval.similarity_threshold),
        )
        .await
        .context("Search failed")
}

/// Lists stored documents with their chunk counts.
pub async fn list(pipeline: &RetrievalPipeline<RedbChunkStore>) -> Result<Vec<DocumentSummary>> {
    let mut summaries = Vec::new();
    for document_id in pipeline.document_ids().await? {
        let chunk_count = pipeline.document_chunks(&document_id).await?.len();
        summaries.push(DocumentSummary {
            document_id,
            chunk_count,
        });
    }
    Ok(summaries)
}

/// Deletes a document, returning how many chunks were removed.
pub async fn delete(pipeline: &RetrievalPipeline<RedbChunkStore>, document_id: &str) -> Result<usize> {
    pipeline
        .delete_document(document_id)
        .await
        .with_context(|| format!("Failed to delete {}", document_id))
}

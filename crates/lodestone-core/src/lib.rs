//! # Lodestone Core
//!
//! Retrieval library for document-grounded question answering: pages of
//! text are split into chunks, embedded with the best available strategy, and
//! ranked against queries by cosine similarity.
//!
//! This crate provides the retrieval pipeline and its collaborators, designed
//! to be driven by any frontend (the `lodestone` CLI, a service, tests).
//!
//! ## Modules
//!
//! - [`processing`] - Retrieval pipeline (ingest, answer, delete)
//! - [`chunking`] - Sentence-based segmentation with overlap
//! - [`embedding`] - Ordered embedding strategies (dense, TF-IDF, word frequency)
//! - [`search`] - Cosine similarity ranking with degraded fallback
//! - [`storage`] - Chunk persistence trait plus in-memory and redb stores
//! - [`workers`] - Dedicated threads for CPU-bound embedding work
//! - [`config`] - Production constants and `RetrievalConfig`
//! - [`error`] - Error types for validation, strategies, storage and workers
//! - [`metrics`] - Performance metrics collection with rolling averages

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod metrics;
pub mod processing;
pub mod search;
pub mod storage;
pub mod workers;

//! Document ingestion and query answering.
//!
//! The `RetrievalPipeline` coordinates:
//! 1. **Segmentation**: splits pages into bounded, overlapping chunks
//! 2. **Embedding**: vectorizes chunks (and queries) on the worker pool
//! 3. **Storage**: upserts chunk records and prunes stale ones
//! 4. **Search**: ranks stored chunks against the query vector
//!
//! # Example
//!
//! ```ignore
//! use lodestone_core::processing::RetrievalPipeline;
//!
//! let report = pipeline.ingest("handbook", &pages).await?;
//! println!("{} chunks via {}", report.chunk_count, report.strategy);
//!
//! let answer = pipeline.answer("How do refunds work?", None, 5, 0.01).await?;
//! for hit in &answer.hits {
//!     println!("p.{} {:.3} {}", hit.page_number, hit.similarity, hit.content);
//! }
//! ```

mod pipeline;

pub use pipeline::{Answer, IngestReport, RetrievalPipeline};

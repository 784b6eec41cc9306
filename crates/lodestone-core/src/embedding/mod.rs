//! Multi-strategy text embedding.
//!
//! ## Core Traits
//!
//! - [`EmbeddingStrategy`] - Fits an [`EmbeddingSpace`] on a corpus
//! - [`FittedModel`] - Transforms texts inside a fitted space
//! - [`DenseEncoder`] - Pretrained encoder supplied by the caller
//!
//! ## Strategies
//!
//! Tried in this order by the [`EmbeddingGenerator`]:
//!
//! 1. [`DenseStrategy`] - pretrained dense encoder, when one loaded
//! 2. [`TfidfStrategy`] - TF-IDF fitted on the texts being embedded
//! 3. [`FrequencyStrategy`] - L1-normalized word counts
//!
//! ## Example
//!
//! ```
//! use lodestone_core::config::RetrievalConfig;
//! use lodestone_core::embedding::{EmbeddingGenerator, StrategyKind};
//!
//! let generator = EmbeddingGenerator::from_config(&RetrievalConfig::default(), None);
//! let corpus = vec!["Rust is a systems language".to_string()];
//! let batch = generator.embed_batch(&corpus);
//! assert_eq!(batch.strategy, Some(StrategyKind::Tfidf));
//!
//! let query = generator.embed_query("systems programming", &corpus).unwrap();
//! assert_eq!(query.strategy, StrategyKind::Tfidf);
//! ```

mod dense;
mod frequency;
mod generator;
mod space;
mod stopwords;
mod tfidf;
mod traits;

pub use dense::DenseStrategy;
pub use frequency::{FrequencyModel, FrequencyStrategy};
pub use generator::{EmbeddingBatch, EmbeddingGenerator, QueryEmbedding};
pub use space::EmbeddingSpace;
pub use stopwords::is_stop_word;
pub use tfidf::{TfidfModel, TfidfStrategy};
pub use traits::{DenseEncoder, EmbeddingStrategy, FittedModel, StrategyKind};

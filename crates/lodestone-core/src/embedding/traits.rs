//! Traits for embedding strategies.
//!
//! An [`EmbeddingStrategy`] turns a corpus into a fitted [`EmbeddingSpace`];
//! the space then transforms texts into vectors. Fitting is trivial for a
//! pretrained dense encoder and learns a vocabulary for the lexical
//! strategies.

use super::space::EmbeddingSpace;
use crate::error::StrategyError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies which strategy produced a set of vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Pretrained dense encoder; fixed dimension, globally comparable
    Dense,
    /// Corpus-fitted TF-IDF over unigrams and bigrams
    Tfidf,
    /// L1-normalized word counts over the batch vocabulary
    Frequency,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Dense => "dense",
            StrategyKind::Tfidf => "tfidf",
            StrategyKind::Frequency => "frequency",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One way of producing embedding vectors.
///
/// # Thread Safety
///
/// Strategies are shared with the embedding worker threads and must be
/// `Send + Sync`.
pub trait EmbeddingStrategy: Send + Sync {
    /// Returns the kind tag recorded on every space this strategy fits.
    fn kind(&self) -> StrategyKind;

    /// Fits an embedding space on `corpus`.
    ///
    /// # Errors
    ///
    /// * `StrategyError::Unavailable` - the strategy's dependency is missing
    /// * `StrategyError::Failed` - the corpus could not be fitted (for example,
    ///   it yields an empty vocabulary)
    fn fit(&self, corpus: &[String]) -> Result<EmbeddingSpace, StrategyError>;
}

/// A fitted model able to map texts into its vector space.
pub trait FittedModel: Send + Sync {
    /// Dimension of every vector this model produces.
    fn dimension(&self) -> usize;

    /// Transforms each text into a vector of [`dimension`](Self::dimension).
    fn transform(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StrategyError>;
}

/// Pretrained sentence encoder supplied by the embedding collaborator.
///
/// # Examples
///
/// ```ignore
/// struct MiniLm { /* model handle */ }
///
/// impl DenseEncoder for MiniLm {
///     fn model_id(&self) -> &str { "paraphrase-MiniLM-L3-v2" }
///     fn dimension(&self) -> usize { 384 }
///     fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StrategyError> {
///         // run inference
///     }
/// }
/// ```
pub trait DenseEncoder: Send + Sync {
    /// Model identifier, used for logging.
    fn model_id(&self) -> &str;

    /// Output dimension.
    fn dimension(&self) -> usize;

    /// Encodes texts; one vector per input text.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StrategyError>;
}

//! Explicit embedding spaces.
//!
//! Vectors are only comparable when they come from the same space. An
//! [`EmbeddingSpace`] carries the fitted model together with the strategy that
//! produced it and, for query spaces, the corpus version it was fitted on.

use super::traits::{FittedModel, StrategyKind};
use crate::error::StrategyError;
use std::fmt;
use std::sync::Arc;

/// A fitted embedding model tagged with its provenance.
///
/// Cloning is cheap; the model is shared.
#[derive(Clone)]
pub struct EmbeddingSpace {
    strategy: StrategyKind,
    corpus_version: Option<u64>,
    model: Arc<dyn FittedModel>,
}

impl EmbeddingSpace {
    pub fn new(strategy: StrategyKind, model: Arc<dyn FittedModel>) -> Self {
        Self {
            strategy,
            corpus_version: None,
            model,
        }
    }

    /// Tags the space with the corpus version it was fitted on.
    pub fn with_corpus_version(mut self, version: u64) -> Self {
        self.corpus_version = Some(version);
        self
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    pub fn corpus_version(&self) -> Option<u64> {
        self.corpus_version
    }

    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }

    /// Transforms a batch of texts.
    ///
    /// Fails if the model errors, returns the wrong number of vectors, or
    /// returns a vector whose length differs from [`dimension`](Self::dimension).
    pub fn transform(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StrategyError> {
        let vectors = self.model.transform(texts)?;
        if vectors.len() != texts.len() {
            return Err(StrategyError::Failed(format!(
                "{} produced {} vectors for {} texts",
                self.strategy,
                vectors.len(),
                texts.len()
            )));
        }
        let dimension = self.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(StrategyError::Failed(format!(
                "{} produced a {}-dimensional vector, expected {}",
                self.strategy,
                bad.len(),
                dimension
            )));
        }
        Ok(vectors)
    }

    /// Transforms a single text.
    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>, StrategyError> {
        self.transform(&[text.to_string()])?
            .pop()
            .ok_or_else(|| StrategyError::Failed("empty transform result".to_string()))
    }
}

impl fmt::Debug for EmbeddingSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingSpace")
            .field("strategy", &self.strategy)
            .field("corpus_version", &self.corpus_version)
            .field("dimension", &self.dimension())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        dim: usize,
        rows: Vec<Vec<f32>>,
    }

    impl FittedModel for Fixed {
        fn dimension(&self) -> usize {
            self.dim
        }

        fn transform(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, StrategyError> {
            Ok(self.rows.clone())
        }
    }

    #[test]
    fn test_transform_rejects_count_mismatch() {
        let space = EmbeddingSpace::new(
            StrategyKind::Dense,
            Arc::new(Fixed {
                dim: 2,
                rows: vec![vec![1.0, 0.0]],
            }),
        );
        let texts = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(
            space.transform(&texts),
            Err(StrategyError::Failed(_))
        ));
    }

    #[test]
    fn test_transform_rejects_ragged_dimensions() {
        let space = EmbeddingSpace::new(
            StrategyKind::Dense,
            Arc::new(Fixed {
                dim: 2,
                rows: vec![vec![1.0, 0.0, 0.0]],
            }),
        );
        assert!(space.embed_one("a").is_err());
    }

    #[test]
    fn test_corpus_version_tag() {
        let space = EmbeddingSpace::new(
            StrategyKind::Tfidf,
            Arc::new(Fixed {
                dim: 1,
                rows: vec![vec![1.0]],
            }),
        );
        assert_eq!(space.corpus_version(), None);
        let space = space.with_corpus_version(7);
        assert_eq!(space.corpus_version(), Some(7));
        assert_eq!(space.embed_one("x").unwrap(), vec![1.0]);
    }
}

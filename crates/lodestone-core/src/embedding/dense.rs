//! Dense encoder strategy.
//!
//! Wraps an optional [`DenseEncoder`]. The encoder is loaded once when the
//! strategy is built; if loading fails the strategy reports itself
//! unavailable for the rest of the process and the generator falls through to
//! the lexical strategies.

use super::space::EmbeddingSpace;
use super::traits::{DenseEncoder, EmbeddingStrategy, FittedModel, StrategyKind};
use crate::error::StrategyError;
use std::sync::Arc;
use tracing::{info, warn};

pub struct DenseStrategy {
    encoder: Result<Arc<dyn DenseEncoder>, String>,
}

impl DenseStrategy {
    /// Wraps an already loaded encoder.
    pub fn new(encoder: Arc<dyn DenseEncoder>) -> Self {
        Self {
            encoder: Ok(encoder),
        }
    }

    /// Runs `loader` once and keeps the outcome.
    pub fn load<F>(loader: F) -> Self
    where
        F: FnOnce() -> Result<Arc<dyn DenseEncoder>, StrategyError>,
    {
        match loader() {
            Ok(encoder) => {
                info!(
                    model = encoder.model_id(),
                    dimension = encoder.dimension(),
                    "Dense encoder loaded"
                );
                Self::new(encoder)
            }
            Err(e) => {
                warn!("Dense encoder unavailable, lexical strategies will be used: {}", e);
                Self::unavailable(e.to_string())
            }
        }
    }

    /// A strategy that always reports `Unavailable`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            encoder: Err(reason.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.encoder.is_ok()
    }
}

impl EmbeddingStrategy for DenseStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Dense
    }

    fn fit(&self, _corpus: &[String]) -> Result<EmbeddingSpace, StrategyError> {
        match &self.encoder {
            Ok(encoder) => Ok(EmbeddingSpace::new(
                StrategyKind::Dense,
                Arc::new(DenseModel(encoder.clone())),
            )),
            Err(reason) => Err(StrategyError::Unavailable(reason.clone())),
        }
    }
}

/// A pretrained encoder needs no fitting; the space is the encoder itself.
struct DenseModel(Arc<dyn DenseEncoder>);

impl FittedModel for DenseModel {
    fn dimension(&self) -> usize {
        self.0.dimension()
    }

    fn transform(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StrategyError> {
        self.0.encode(texts)
    }
}

//! Ordered strategy fallback.
//!
//! The [`EmbeddingGenerator`] holds strategies in quality order and uses the
//! first one that succeeds. Failures never escape: a strategy error moves on
//! to the next strategy, and when every strategy fails the result is empty.

use super::dense::DenseStrategy;
use super::frequency::FrequencyStrategy;
use super::space::EmbeddingSpace;
use super::tfidf::TfidfStrategy;
use super::traits::{EmbeddingStrategy, StrategyKind};
use crate::config::RetrievalConfig;
use crate::error::StrategyError;
use crate::metrics::global_metrics;
use instant::Instant;
use tracing::{debug, info, instrument, warn};

/// Vectors for a batch of texts, all from one embedding space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingBatch {
    /// Strategy that produced the vectors; `None` when nothing succeeded
    pub strategy: Option<StrategyKind>,
    /// One vector per input text, or empty
    pub vectors: Vec<Vec<f32>>,
}

impl EmbeddingBatch {
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.vectors.first().map_or(0, Vec::len)
    }
}

/// A query vector and the strategy that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryEmbedding {
    pub strategy: StrategyKind,
    pub vector: Vec<f32>,
}

pub struct EmbeddingGenerator {
    strategies: Vec<Box<dyn EmbeddingStrategy>>,
}

impl EmbeddingGenerator {
    /// Creates a generator trying `strategies` in the given order.
    pub fn new(strategies: Vec<Box<dyn EmbeddingStrategy>>) -> Self {
        Self { strategies }
    }

    /// Standard order: dense encoder (if given), TF-IDF, word frequency.
    pub fn from_config(config: &RetrievalConfig, dense: Option<DenseStrategy>) -> Self {
        let mut strategies: Vec<Box<dyn EmbeddingStrategy>> = Vec::with_capacity(3);
        if let Some(dense) = dense {
            strategies.push(Box::new(dense));
        }
        strategies.push(Box::new(TfidfStrategy::new(config.max_features)));
        strategies.push(Box::new(FrequencyStrategy));
        Self::new(strategies)
    }

    /// Strategy kinds in the order they are tried.
    pub fn strategies(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Embeds a batch of chunk texts.
    ///
    /// The batch is atomic: either every text gets a vector from the same
    /// strategy, or the result is empty. Empty input returns an empty batch
    /// without consulting any strategy.
    #[instrument(skip_all, fields(texts = texts.len()))]
    pub fn embed_batch(&self, texts: &[String]) -> EmbeddingBatch {
        if texts.is_empty() {
            return EmbeddingBatch::default();
        }

        let start = Instant::now();
        let batch = match self.first_success(texts, texts) {
            Some((space, vectors)) => EmbeddingBatch {
                strategy: Some(space.strategy()),
                vectors,
            },
            None => {
                warn!(texts = texts.len(), "All embedding strategies failed");
                EmbeddingBatch::default()
            }
        };
        global_metrics().record_embedding(start.elapsed().as_secs_f64() * 1000.0);
        batch
    }

    /// Embeds a query so that it is comparable with vectors fitted on `corpus`.
    ///
    /// Each strategy is fitted on the corpus plus the query, then only the
    /// query is transformed. Returns `None` if every strategy fails.
    #[instrument(skip_all, fields(corpus = corpus.len()))]
    pub fn embed_query(&self, query: &str, corpus: &[String]) -> Option<QueryEmbedding> {
        let start = Instant::now();
        let mut fit_on = Vec::with_capacity(corpus.len() + 1);
        fit_on.extend_from_slice(corpus);
        fit_on.push(query.to_string());

        let result = self
            .first_success(&fit_on, &[query.to_string()])
            .and_then(|(space, mut vectors)| {
                vectors.pop().map(|vector| QueryEmbedding {
                    strategy: space.strategy(),
                    vector,
                })
            });
        if result.is_none() {
            warn!("All embedding strategies failed for query");
        }
        global_metrics().record_embedding(start.elapsed().as_secs_f64() * 1000.0);
        result
    }

    /// Fits the first available space on `corpus` without transforming anything.
    pub fn fit_space(&self, corpus: &[String]) -> Option<EmbeddingSpace> {
        self.strategies
            .iter()
            .find_map(|strategy| match strategy.fit(corpus) {
                Ok(space) => Some(space),
                Err(e) => {
                    log_strategy_failure(strategy.kind(), &e);
                    None
                }
            })
    }

    fn first_success(
        &self,
        fit_on: &[String],
        embed: &[String],
    ) -> Option<(EmbeddingSpace, Vec<Vec<f32>>)> {
        for strategy in &self.strategies {
            let kind = strategy.kind();
            let attempt = strategy
                .fit(fit_on)
                .and_then(|space| space.transform(embed).map(|vectors| (space, vectors)));

            match attempt {
                Ok((space, vectors)) => {
                    info!(
                        strategy = %kind,
                        dimension = space.dimension(),
                        vectors = vectors.len(),
                        "strategy-selected"
                    );
                    global_metrics().record_strategy(kind);
                    return Some((space, vectors));
                }
                Err(e) => log_strategy_failure(kind, &e),
            }
        }
        None
    }
}

fn log_strategy_failure(kind: StrategyKind, err: &StrategyError) {
    match err {
        StrategyError::Unavailable(_) => debug!(strategy = %kind, "Skipping strategy: {}", err),
        StrategyError::Failed(_) => warn!(strategy = %kind, "Falling back: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::traits::{DenseEncoder, FittedModel};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|t| t.to_string()).collect()
    }

    struct Unit;

    impl DenseEncoder for Unit {
        fn model_id(&self) -> &str {
            "unit"
        }

        fn dimension(&self) -> usize {
            4
        }

        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StrategyError> {
            Ok(texts.iter().map(|_| vec![0.5; 4]).collect())
        }
    }

    struct Counting(Arc<AtomicUsize>);

    impl EmbeddingStrategy for Counting {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Dense
        }

        fn fit(&self, _corpus: &[String]) -> Result<EmbeddingSpace, StrategyError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(StrategyError::Failed("boom".into()))
        }
    }

    /// Returns one vector fewer than requested.
    struct ShortChanging;

    impl FittedModel for ShortChanging {
        fn dimension(&self) -> usize {
            1
        }

        fn transform(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StrategyError> {
            Ok(vec![vec![1.0]; texts.len().saturating_sub(1)])
        }
    }

    struct ShortStrategy;

    impl EmbeddingStrategy for ShortStrategy {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Dense
        }

        fn fit(&self, _corpus: &[String]) -> Result<EmbeddingSpace, StrategyError> {
            Ok(EmbeddingSpace::new(StrategyKind::Dense, Arc::new(ShortChanging)))
        }
    }

    #[test]
    fn test_dense_preferred_when_available() {
        let generator = EmbeddingGenerator::from_config(
            &RetrievalConfig::default(),
            Some(DenseStrategy::new(Arc::new(Unit))),
        );
        let batch = generator.embed_batch(&texts(&["cats are mammals", "dogs bark"]));
        assert_eq!(batch.strategy, Some(StrategyKind::Dense));
        assert_eq!(batch.dimension(), 4);
        assert_eq!(batch.vectors.len(), 2);
    }

    #[test]
    fn test_falls_back_to_tfidf() {
        let generator = EmbeddingGenerator::from_config(
            &RetrievalConfig::default(),
            Some(DenseStrategy::unavailable("no model")),
        );
        let batch = generator.embed_batch(&texts(&["cats are mammals", "dogs bark"]));
        assert_eq!(batch.strategy, Some(StrategyKind::Tfidf));
        assert_eq!(batch.vectors.len(), 2);
    }

    #[test]
    fn test_stop_words_fall_through_to_frequency() {
        let generator = EmbeddingGenerator::from_config(&RetrievalConfig::default(), None);
        let batch = generator.embed_batch(&texts(&["it is what it is", "we were there"]));
        assert_eq!(batch.strategy, Some(StrategyKind::Frequency));
        assert_eq!(batch.dimension(), 6);
    }

    #[test]
    fn test_wrong_vector_count_falls_through() {
        let generator = EmbeddingGenerator::new(vec![
            Box::new(ShortStrategy),
            Box::new(FrequencyStrategy),
        ]);
        let batch = generator.embed_batch(&texts(&["alpha beta", "gamma"]));
        assert_eq!(batch.strategy, Some(StrategyKind::Frequency));
        assert_eq!(batch.vectors.len(), 2);
    }

    #[test]
    fn test_all_failures_return_empty() {
        let calls = Arc::new(AtomicUsize::new(0));
        let generator = EmbeddingGenerator::new(vec![
            Box::new(Counting(calls.clone())),
            Box::new(Counting(calls.clone())),
        ]);
        let batch = generator.embed_batch(&texts(&["anything at all"]));
        assert!(batch.is_empty());
        assert_eq!(batch.strategy, None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(generator.embed_query("q", &texts(&["c"])).is_none());
    }

    #[test]
    fn test_empty_input_consults_no_strategy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let generator = EmbeddingGenerator::new(vec![Box::new(Counting(calls.clone()))]);
        assert!(generator.embed_batch(&[]).is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_query_is_fitted_with_corpus() {
        let generator = EmbeddingGenerator::from_config(&RetrievalConfig::default(), None);
        let corpus = texts(&["Cats are mammals Dogs are mammals too"]);
        let batch = generator.embed_batch(&corpus);
        let query = generator.embed_query("What are dogs?", &corpus).unwrap();

        assert_eq!(query.strategy, StrategyKind::Tfidf);
        // The query adds no new terms, so both fits share one vocabulary.
        assert_eq!(query.vector.len(), batch.dimension());
        assert!(query.vector.iter().any(|v| *v > 0.0));
    }

    #[test]
    fn test_strategy_order() {
        let generator = EmbeddingGenerator::from_config(
            &RetrievalConfig::default(),
            Some(DenseStrategy::unavailable("none")),
        );
        assert_eq!(
            generator.strategies(),
            vec![StrategyKind::Dense, StrategyKind::Tfidf, StrategyKind::Frequency]
        );
    }

    #[test]
    fn test_fit_space_skips_unavailable() {
        let generator = EmbeddingGenerator::from_config(
            &RetrievalConfig::default(),
            Some(DenseStrategy::unavailable("none")),
        );
        let space = generator.fit_space(&texts(&["rust retrieval"])).unwrap();
        assert_eq!(space.strategy(), StrategyKind::Tfidf);
    }
}

//! Corpus-fitted TF-IDF strategy.
//!
//! Analysis: text is lowercased, tokens are runs of two or more word
//! characters, English stop words are dropped, and the remaining tokens
//! produce unigrams plus space-joined bigrams.
//!
//! Fitting keeps at most `max_features` terms, preferring the highest
//! corpus-wide counts (ties resolved alphabetically), and orders the final
//! features alphabetically. Weights are raw term counts times the smoothed
//! idf `ln((1 + n) / (1 + df)) + 1`, L2-normalized per row.

use super::space::EmbeddingSpace;
use super::stopwords::is_stop_word;
use super::traits::{EmbeddingStrategy, FittedModel, StrategyKind};
use crate::error::StrategyError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

/// Strategy fitting a fresh [`TfidfModel`] on every corpus it is given.
#[derive(Debug, Clone, Copy)]
pub struct TfidfStrategy {
    max_features: usize,
}

impl TfidfStrategy {
    pub fn new(max_features: usize) -> Self {
        Self { max_features }
    }
}

impl EmbeddingStrategy for TfidfStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Tfidf
    }

    fn fit(&self, corpus: &[String]) -> Result<EmbeddingSpace, StrategyError> {
        let model = TfidfModel::fit(corpus, self.max_features)?;
        Ok(EmbeddingSpace::new(StrategyKind::Tfidf, Arc::new(model)))
    }
}

/// Fitted vocabulary and idf weights.
#[derive(Debug, Clone)]
pub struct TfidfModel {
    vocabulary: HashMap<String, usize>,
    features: Vec<String>,
    idf: Vec<f32>,
}

impl TfidfModel {
    /// Learns vocabulary and idf weights from `corpus`.
    ///
    /// # Errors
    ///
    /// `StrategyError::Failed` if the corpus is empty or every token is a
    /// stop word.
    pub fn fit(corpus: &[String], max_features: usize) -> Result<Self, StrategyError> {
        if corpus.is_empty() {
            return Err(StrategyError::Failed("cannot fit on an empty corpus".to_string()));
        }
        if max_features == 0 {
            return Err(StrategyError::Failed("max_features must be non-zero".to_string()));
        }

        // term -> (corpus count, document frequency)
        let mut stats: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for text in corpus {
            for (term, count) in term_counts(text) {
                let entry = stats.entry(term).or_insert((0, 0));
                entry.0 += count;
                entry.1 += 1;
            }
        }

        if stats.is_empty() {
            return Err(StrategyError::Failed(
                "empty vocabulary; documents contain only stop words".to_string(),
            ));
        }

        let mut ranked: Vec<(String, (usize, usize))> = stats.into_iter().collect();
        if ranked.len() > max_features {
            // Stable sort over alphabetical order keeps ties alphabetical.
            ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0));
            ranked.truncate(max_features);
            ranked.sort_by(|a, b| a.0.cmp(&b.0));
        }

        let n = corpus.len() as f64;
        let mut vocabulary = HashMap::with_capacity(ranked.len());
        let mut features = Vec::with_capacity(ranked.len());
        let mut idf = Vec::with_capacity(ranked.len());
        for (index, (term, (_, df))) in ranked.into_iter().enumerate() {
            idf.push((((1.0 + n) / (1.0 + df as f64)).ln() + 1.0) as f32);
            vocabulary.insert(term.clone(), index);
            features.push(term);
        }

        Ok(Self {
            vocabulary,
            features,
            idf,
        })
    }

    /// Feature names in column order.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    fn transform_one(&self, text: &str) -> Vec<f32> {
        let mut row = vec![0.0f32; self.features.len()];
        for (term, count) in term_counts(text) {
            if let Some(&col) = self.vocabulary.get(&term) {
                row[col] = count as f32 * self.idf[col];
            }
        }
        let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            row.iter_mut().for_each(|v| *v /= norm);
        }
        row
    }
}

impl FittedModel for TfidfModel {
    fn dimension(&self) -> usize {
        self.features.len()
    }

    fn transform(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StrategyError> {
        Ok(texts.iter().map(|t| self.transform_one(t)).collect())
    }
}

/// Unigram and bigram terms of `text` after stop-word removal.
fn analyze(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !is_stop_word(t))
        .collect();

    let mut terms: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    terms.extend(tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    terms
}

fn term_counts(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for term in analyze(text) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_analyze_removes_stop_words_before_bigrams() {
        let terms = analyze("Cats are mammals, the dogs too");
        assert_eq!(
            terms,
            vec!["cats", "mammals", "dogs", "cats mammals", "mammals dogs"]
        );
    }

    #[test]
    fn test_single_character_tokens_ignored() {
        assert_eq!(analyze("a b c dog"), vec!["dog"]);
    }

    #[test]
    fn test_features_sorted_alphabetically() {
        let model = TfidfModel::fit(&corpus(&["zebra apple", "mango"]), 384).unwrap();
        assert_eq!(model.features(), &["apple", "mango", "zebra", "zebra apple"]);
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let model = TfidfModel::fit(
            &corpus(&["common common rare", "common other"]),
            2,
        )
        .unwrap();
        // "common" (3) wins; "common common", "common other", "common rare",
        // "other", "rare" tie at 1 and the alphabetically first is kept.
        assert_eq!(model.features(), &["common", "common common"]);
    }

    #[test]
    fn test_rows_are_l2_normalized() {
        let model = TfidfModel::fit(&corpus(&["rust embeddings search", "rust"]), 384).unwrap();
        let rows = model.transform(&corpus(&["rust embeddings search"])).unwrap();
        let norm: f32 = rows[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_idf_is_smoothed() {
        let model = TfidfModel::fit(&corpus(&["alpha beta", "alpha"]), 384).unwrap();
        let col = |term: &str| model.vocabulary[term];
        // alpha appears in both documents: ln(3/3) + 1 = 1
        assert!((model.idf[col("alpha")] - 1.0).abs() < 1e-6);
        // beta appears in one: ln(3/2) + 1
        let expected = (1.5f64.ln() + 1.0) as f32;
        assert!((model.idf[col("beta")] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_terms_give_zero_vector() {
        let model = TfidfModel::fit(&corpus(&["alpha beta"]), 384).unwrap();
        let rows = model.transform(&corpus(&["gamma"])).unwrap();
        assert!(rows[0].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_stop_word_corpus_fails() {
        let err = TfidfModel::fit(&corpus(&["it is what it is", "we were there"]), 384);
        assert!(matches!(err, Err(StrategyError::Failed(_))));
    }

    #[test]
    fn test_strategy_fits_space() {
        let space = TfidfStrategy::new(384)
            .fit(&corpus(&["cats mammals dogs"]))
            .unwrap();
        assert_eq!(space.strategy(), StrategyKind::Tfidf);
        assert_eq!(space.dimension(), 5);
    }
}

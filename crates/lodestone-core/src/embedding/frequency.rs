//! Last-resort word frequency vectors.
//!
//! The vocabulary is every whitespace-separated lowercase word of the fitting
//! corpus, sorted. Each text becomes its vocabulary word counts divided by
//! their sum (L1 normalization); texts with no vocabulary words map to the
//! zero vector.

use super::space::EmbeddingSpace;
use super::traits::{EmbeddingStrategy, FittedModel, StrategyKind};
use crate::error::StrategyError;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
pub struct FrequencyStrategy;

impl EmbeddingStrategy for FrequencyStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Frequency
    }

    fn fit(&self, corpus: &[String]) -> Result<EmbeddingSpace, StrategyError> {
        let model = FrequencyModel::fit(corpus)?;
        Ok(EmbeddingSpace::new(StrategyKind::Frequency, Arc::new(model)))
    }
}

#[derive(Debug, Clone)]
pub struct FrequencyModel {
    columns: HashMap<String, usize>,
}

impl FrequencyModel {
    pub fn fit(corpus: &[String]) -> Result<Self, StrategyError> {
        let words: BTreeSet<String> = corpus
            .iter()
            .flat_map(|text| text.to_lowercase().split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .collect();

        if words.is_empty() {
            return Err(StrategyError::Failed("corpus contains no words".to_string()));
        }

        let columns = words
            .into_iter()
            .enumerate()
            .map(|(index, word)| (word, index))
            .collect();
        Ok(Self { columns })
    }

    fn transform_one(&self, text: &str) -> Vec<f32> {
        let mut row = vec![0.0f32; self.columns.len()];
        for word in text.to_lowercase().split_whitespace() {
            if let Some(&col) = self.columns.get(word) {
                row[col] += 1.0;
            }
        }
        let total: f32 = row.iter().sum();
        if total > 0.0 {
            row.iter_mut().for_each(|v| *v /= total);
        }
        row
    }
}

impl FittedModel for FrequencyModel {
    fn dimension(&self) -> usize {
        self.columns.len()
    }

    fn transform(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StrategyError> {
        Ok(texts.iter().map(|t| self.transform_one(t)).collect())
    }
}

//! Production configuration.
//!
//! This module holds the constants that define the default retrieval
//! behaviour, plus [`RetrievalConfig`], the serde-deserializable settings
//! struct used by the pipeline and the CLI.
//!
//! # Usage
//!
//! ```
//! use lodestone_core::config::{RetrievalConfig, DEFAULT_CHUNK_SIZE};
//!
//! let config = RetrievalConfig::default();
//! assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
//! assert!(config.validate().is_ok());
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

// =============================================================================
// Segmentation
// =============================================================================

/// Maximum chunk length in characters.
///
/// A single sentence longer than this still becomes its own chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Overlap setting. Divided by [`OVERLAP_SENTENCE_DIVISOR`] to obtain the
/// number of trailing sentences carried into the next chunk (minimum one).
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Divisor turning `chunk_overlap` into a sentence count.
pub const OVERLAP_SENTENCE_DIVISOR: usize = 100;

/// Fragments shorter than this many characters are not sentences.
pub const MIN_SENTENCE_CHARS: usize = 10;

// =============================================================================
// Embedding
// =============================================================================

/// Vocabulary bound for the TF-IDF strategy.
pub const DEFAULT_MAX_FEATURES: usize = 384;

/// Threads dedicated to embedding and query-time refits.
pub const DEFAULT_WORKER_THREADS: usize = 2;

// =============================================================================
// Search
// =============================================================================

/// Minimum similarity a hit must reach to be returned.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.01;

/// Number of hits handed to the generation step.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Score assigned when vector dimensions differ and both carry magnitude.
pub const DEGRADED_SIMILARITY: f32 = 0.1;

/// How the query vector's embedding space is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuerySpace {
    /// Refit over the candidate corpus plus the query for every query.
    #[default]
    Refit,
    /// Fit over the candidate corpus only and reuse the fit until the corpus
    /// version changes.
    Cached,
}

/// Retrieval settings.
///
/// Every field has a default, so a partial JSON document is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Overlap setting (see [`OVERLAP_SENTENCE_DIVISOR`]); zero disables overlap
    pub chunk_overlap: usize,
    /// TF-IDF vocabulary bound
    pub max_features: usize,
    /// Default similarity threshold for [`ask`](crate::processing::RetrievalPipeline::ask)
    pub similarity_threshold: f32,
    /// Default hit limit for [`ask`](crate::processing::RetrievalPipeline::ask)
    pub default_limit: usize,
    /// Score used on dimension mismatch
    pub degraded_score: f32,
    /// Embedding worker threads
    pub worker_threads: usize,
    /// Query embedding space mode
    pub query_space: QuerySpace,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            max_features: DEFAULT_MAX_FEATURES,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            default_limit: DEFAULT_SEARCH_LIMIT,
            degraded_score: DEGRADED_SIMILARITY,
            worker_threads: DEFAULT_WORKER_THREADS,
            query_space: QuerySpace::Refit,
        }
    }
}

impl RetrievalConfig {
    /// Parses a JSON document, filling missing fields with defaults, and
    /// validates the result.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field against its accepted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size", "must be greater than zero"));
        }
        if self.max_features == 0 {
            return Err(invalid("max_features", "must be greater than zero"));
        }
        if self.default_limit == 0 {
            return Err(invalid("default_limit", "must be greater than zero"));
        }
        if self.worker_threads == 0 {
            return Err(invalid("worker_threads", "must be greater than zero"));
        }
        if !self.similarity_threshold.is_finite() {
            return Err(invalid("similarity_threshold", "must be a finite number"));
        }
        if !(0.0..=1.0).contains(&self.degraded_score) {
            return Err(invalid("degraded_score", "must be within [0, 1]"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = RetrievalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.max_features, 384);
        assert_eq!(config.default_limit, 5);
        assert_eq!(config.query_space, QuerySpace::Refit);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            RetrievalConfig::from_json_str(r#"{"chunk_size": 200, "query_space": "cached"}"#)
                .unwrap();
        assert_eq!(config.chunk_size, 200);
        assert_eq!(config.chunk_overlap, DEFAULT_CHUNK_OVERLAP);
        assert_eq!(config.query_space, QuerySpace::Cached);
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let err = RetrievalConfig::from_json_str(r#"{"chunk_size": 0}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "chunk_size",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = RetrievalConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_out_of_range_degraded_score() {
        let config = RetrievalConfig {
            degraded_score: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

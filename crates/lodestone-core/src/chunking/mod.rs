//! Sentence-based document segmentation.
//!
//! Page text is split into sentences on runs of `.`, `!` and `?`, then packed
//! greedily into chunks of at most `chunk_size` characters. Each new chunk is
//! seeded with the trailing sentences of the previous one so that context
//! survives the cut.
//!
//! Chunks never cross a page boundary and a sentence is never split. A chunk
//! longer than `chunk_size` holds at most the overlap sentences plus the one
//! sentence that overflowed.

mod types;

use crate::config::{RetrievalConfig, MIN_SENTENCE_CHARS, OVERLAP_SENTENCE_DIVISOR};
use crate::error::ConfigError;
use crate::metrics::global_metrics;
use instant::Instant;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

pub use types::{chunk_id_for, Chunk, Page};

static SENTENCE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+").expect("sentence boundary pattern is valid"));

/// Splits text into trimmed sentences, dropping fragments shorter than
/// [`MIN_SENTENCE_CHARS`] characters.
pub fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE_BOUNDARY
        .split(text)
        .map(str::trim)
        .filter(|s| s.chars().count() >= MIN_SENTENCE_CHARS)
        .collect()
}

/// Greedy sentence packer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segmenter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Segmenter {
    /// Creates a segmenter.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - Maximum chunk length in characters, must be non-zero
    /// * `chunk_overlap` - Overlap setting; `chunk_overlap / 100` (at least one)
    ///   trailing sentences are carried over, zero disables overlap
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "chunk_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &RetrievalConfig) -> Result<Self, ConfigError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of trailing sentences seeded into each new chunk.
    pub fn overlap_sentences(&self) -> usize {
        if self.chunk_overlap == 0 {
            0
        } else {
            (self.chunk_overlap / OVERLAP_SENTENCE_DIVISOR).max(1)
        }
    }

    /// Segments a document's pages into chunks.
    ///
    /// Deterministic: the same input always produces the same chunks,
    /// including their ids. Blank pages contribute nothing.
    #[instrument(skip_all, fields(document_id = %document_id, pages = pages.len()))]
    pub fn segment(&self, document_id: &str, pages: &[Page]) -> Vec<Chunk> {
        let start = Instant::now();
        let mut chunks = Vec::new();

        for page in pages {
            if page.text.trim().is_empty() {
                continue;
            }
            for sentences in self.pack(split_sentences(&page.text)) {
                let chunk_index = chunks.len();
                let chunk = Chunk {
                    chunk_id: chunk_id_for(document_id, chunk_index),
                    chunk_index,
                    document_id: document_id.to_string(),
                    page_number: page.page_number,
                    content: sentences.join(" "),
                    sentence_count: sentences.len(),
                };
                debug!(
                    chunk_index,
                    page_number = page.page_number,
                    chars = chunk.content.chars().count(),
                    sentences = chunk.sentence_count,
                    "chunk-created"
                );
                chunks.push(chunk);
            }
        }

        global_metrics().record_segmentation(start.elapsed().as_secs_f64() * 1000.0);
        chunks
    }

    /// Packs one page's sentences into groups whose joined length stays
    /// within `chunk_size`. Only an overlap seed plus one overflowing
    /// sentence may exceed it.
    fn pack<'a>(&self, sentences: Vec<&'a str>) -> Vec<Vec<&'a str>> {
        let overlap = self.overlap_sentences();
        let mut groups = Vec::new();
        let mut current: Vec<&'a str> = Vec::new();
        let mut current_len = 0;

        for sentence in sentences {
            let sentence_len = sentence.chars().count();
            if current.is_empty() {
                current.push(sentence);
                current_len = sentence_len;
                continue;
            }

            let proposed = current_len + 1 + sentence_len;
            if proposed <= self.chunk_size {
                current.push(sentence);
                current_len = proposed;
                continue;
            }

            let tail_start = current.len().saturating_sub(overlap);
            let seed: Vec<&'a str> = current[tail_start..].to_vec();
            groups.push(std::mem::take(&mut current));

            current = seed;
            current.push(sentence);
            current_len = joined_len(&current);
        }

        if !current.is_empty() {
            groups.push(current);
        }
        groups
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        let config = RetrievalConfig::default();
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }
}

fn joined_len(sentences: &[&str]) -> usize {
    let chars: usize = sentences.iter().map(|s| s.chars().count()).sum();
    chars + sentences.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(texts: &[&str]) -> Vec<Page> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Page::new(i as u32 + 1, *t))
            .collect()
    }

    #[test]
    fn test_split_sentences_drops_short_fragments() {
        let sentences = split_sentences("Hello there friend! Ok. Is this working?!  Yes");
        assert_eq!(sentences, vec!["Hello there friend", "Is this working"]);
    }

    #[test]
    fn test_split_sentences_keeps_ten_char_fragment() {
        assert_eq!(split_sentences("abcdefghij."), vec!["abcdefghij"]);
        assert!(split_sentences("abcdefghi.").is_empty());
    }

    #[test]
    fn test_single_page_example() {
        let segmenter = Segmenter::default();
        let chunks = segmenter.segment("doc", &pages(&["Cats are mammals. Dogs are mammals too."]));

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Cats are mammals Dogs are mammals too");
        assert_eq!(chunks[0].page_number, 1);
        assert_eq!(chunks[0].sentence_count, 2);
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn test_size_bound_and_overlap() {
        // Each sentence is 19 characters; two joined are 39.
        let text = "Sentence number one. Sentence number two. Sentence number 333. Sentence number 444.";
        let segmenter = Segmenter::new(40, 100).unwrap();
        let chunks = segmenter.segment("doc", &pages(&[text]));

        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 40, "{:?}", chunk.content);
        }
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "Sentence number one Sentence number two",
                "Sentence number two Sentence number 333",
                "Sentence number 333 Sentence number 444",
            ]
        );
        assert!(chunks.iter().all(|c| c.sentence_count == 2));
    }

    #[test]
    fn test_no_overlap_when_disabled() {
        let text = "Sentence number one. Sentence number two. Sentence number 333.";
        let segmenter = Segmenter::new(40, 0).unwrap();
        let chunks = segmenter.segment("doc", &pages(&[text]));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "Sentence number one Sentence number two");
        assert_eq!(chunks[1].content, "Sentence number 333");
        assert_eq!(chunks[1].sentence_count, 1);
    }

    #[test]
    fn test_overlap_sentence_count() {
        assert_eq!(Segmenter::new(10, 0).unwrap().overlap_sentences(), 0);
        assert_eq!(Segmenter::new(10, 50).unwrap().overlap_sentences(), 1);
        assert_eq!(Segmenter::new(10, 100).unwrap().overlap_sentences(), 1);
        assert_eq!(Segmenter::new(10, 250).unwrap().overlap_sentences(), 2);
    }

    #[test]
    fn test_oversized_sentence_is_own_chunk() {
        let long = "This sentence is much longer than the tiny chunk size allows";
        let text = format!("Short one here. {}. Another short one.", long);
        let segmenter = Segmenter::new(20, 0).unwrap();
        let chunks = segmenter.segment("doc", &pages(&[&text]));

        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["Short one here", long, "Another short one"]);
    }

    #[test]
    fn test_oversized_sentence_keeps_overlap() {
        let long = "This sentence is much longer than the tiny chunk size allows";
        let text = format!("Short one here. {}. Another short one.", long);
        let segmenter = Segmenter::new(20, 100).unwrap();
        let chunks = segmenter.segment("doc", &pages(&[&text]));

        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        assert_eq!(
            contents,
            vec![
                "Short one here".to_string(),
                format!("Short one here {}", long),
                format!("{} Another short one", long),
            ]
        );
        assert!(chunks.iter().all(|c| c.sentence_count <= 2));
    }

    #[test]
    fn test_overlap_kept_for_long_sentences() {
        let first = "alpha ".repeat(100);
        let second = "omega ".repeat(84);
        let (first, second) = (first.trim(), second.trim());
        assert_eq!(first.chars().count(), 599);
        assert_eq!(second.chars().count(), 503);

        let text = format!("{}. {}.", first, second);
        let segmenter = Segmenter::new(1000, 100).unwrap();
        let chunks = segmenter.segment("doc", &pages(&[&text]));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, first);
        assert_eq!(chunks[1].content, format!("{} {}", first, second));
        assert_eq!(chunks[1].sentence_count, 2);
    }

    #[test]
    fn test_chunks_never_span_pages() {
        let segmenter = Segmenter::default();
        let chunks = segmenter.segment(
            "doc",
            &pages(&["First page sentence.", "   ", "Third page sentence."]),
        );

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].page_number, 1);
        assert_eq!(chunks[1].page_number, 3);
        assert_eq!(chunks[1].chunk_index, 1);
    }

    #[test]
    fn test_segmentation_is_deterministic() {
        let segmenter = Segmenter::new(50, 100).unwrap();
        let input = pages(&["Alpha beta gamma delta. Epsilon zeta eta theta. Iota kappa lambda mu."]);
        assert_eq!(segmenter.segment("doc", &input), segmenter.segment("doc", &input));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(Segmenter::new(0, 100).is_err());
    }

    #[test]
    fn test_no_sentences_yields_no_chunks() {
        let segmenter = Segmenter::default();
        assert!(segmenter.segment("doc", &pages(&["tiny. bits. only!"])).is_empty());
    }
}

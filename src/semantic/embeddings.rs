//! Statistical text embedder.
//!
//! Maps text to a fixed-length vector without a trained model:
//! - `0..10`: whole-text statistics
//! - next `ngram_slots`: top character 2/3-gram frequencies
//! - next `word_buckets`: hashed word frequencies
//! - last `position_buckets`: hashed word positions
//!
//! The result is L2-normalized, or all zero when the text has no tokens.

use crate::config::EmbeddingConfig;

use super::features::{scalar_features, SCALAR_FEATURES};
use super::frequency::FrequencyTable;
use super::hashing::{hash_positions, hash_word_frequencies};
use super::ngrams::fill_ngram_features;
use super::normalize::normalize;
use super::vector::normalize_in_place;

/// A fixed-length embedding; unit length or all zero.
pub type EmbeddingVector = Vec<f32>;

/// Text to vector function used on every insert and every query.
pub trait Embedder: Send + Sync {
    /// Short identifier of the embedding scheme.
    fn name(&self) -> &str;

    fn dimensions(&self) -> usize;

    /// Embed `text`. Never fails; the result always has `dimensions()` entries.
    fn embed(&self, text: &str) -> EmbeddingVector;
}

/// Hand-engineered embedder built from text statistics and feature hashing.
#[derive(Debug, Clone, Default)]
pub struct StatisticalEmbedder {
    config: EmbeddingConfig,
}

impl StatisticalEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }
}

impl Embedder for StatisticalEmbedder {
    fn name(&self) -> &str {
        "statistical"
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions()
    }

    fn embed(&self, text: &str) -> EmbeddingVector {
        log::debug!("Embedding text ({} bytes)", text.len());

        let mut embedding = vec![0.0f32; self.dimensions()];

        let normalized = normalize(text);
        if normalized.is_empty() {
            return embedding;
        }

        let words: FrequencyTable = normalized.tokens.iter().map(String::as_str).collect();
        let case_text = if self.config.capital_ratio_over_original {
            text
        } else {
            normalized.text.as_str()
        };

        let (scalars, rest) = embedding.split_at_mut(SCALAR_FEATURES);
        let (ngrams, rest) = rest.split_at_mut(self.config.ngram_slots);
        let (word_region, position_region) = rest.split_at_mut(self.config.word_buckets);

        scalars.copy_from_slice(&scalar_features(&normalized, &words, case_text));
        fill_ngram_features(&normalized.text, normalized.char_len(), ngrams);
        hash_word_frequencies(
            &words,
            normalized.tokens.len(),
            self.config.hash_multiplier,
            word_region,
        );
        hash_positions(
            &normalized.tokens,
            self.config.hash_multiplier,
            position_region,
        );

        normalize_in_place(&mut embedding);
        embedding
    }
}

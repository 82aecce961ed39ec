//! Query ranking on top of a [`VectorStore`].
//!
//! Filters store hits by a similarity threshold and applies the favorite
//! boost. The boost is reported alongside the raw score and never changes
//! the store's ordering.

use std::sync::Arc;

use crate::config::SearchConfig;
use crate::documents::Document;

use super::embeddings::Embedder;
use super::index::{IndexError, VectorStore};

#[derive(Debug, thiserror::Error)]
pub enum RankError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] IndexError),
}

/// A decoded document with its raw and boosted similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub document: Document,
    /// Cosine similarity as reported by the store
    pub score: f32,
    /// `score * favorite_boost` for favorites, otherwise `score`
    pub boosted_score: f32,
}

pub struct SimilarityRanker {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    favorite_boost: f32,
}

/// Reject a zero limit and thresholds outside `[0, 1]`.
pub fn check_params(limit: usize, threshold: f32) -> Result<(), RankError> {
    if limit == 0 {
        return Err(RankError::InvalidParameter(
            "limit must be greater than zero".to_string(),
        ));
    }

    if threshold.is_nan() || !(0.0..=1.0).contains(&threshold) {
        return Err(RankError::InvalidParameter(format!(
            "threshold must be within [0, 1], got {threshold}"
        )));
    }

    Ok(())
}

impl SimilarityRanker {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            favorite_boost: config.favorite_boost,
        }
    }

    /// Up to `limit` results with similarity `>= threshold`, best first.
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<RankedResult>, RankError> {
        check_params(limit, threshold)?;
        self.rank(query, limit, Some(threshold))
    }

    /// Every document up to `limit`, with no threshold applied.
    ///
    /// Uses the empty query, whose embedding is the zero vector, so the
    /// store reports similarity 0 for all entries.
    pub fn list_all(&self, limit: usize) -> Result<Vec<RankedResult>, RankError> {
        check_params(limit, 0.0)?;
        self.rank("", limit, None)
    }

    fn rank(
        &self,
        query: &str,
        limit: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<RankedResult>, RankError> {
        let probe = self.embedder.embed(query);

        if threshold.is_some() && probe.iter().all(|x| *x == 0.0) {
            log::debug!("Query has no tokens, every similarity will be zero");
        }

        let hits = self.store.query(&probe, limit)?;
        let total = hits.len();

        let results: Vec<RankedResult> = hits
            .into_iter()
            .filter(|hit| threshold.map_or(true, |min| hit.similarity >= min))
            .map(|hit| {
                let document = Document::from_stored(&hit.id, &hit.content, &hit.metadata);
                let boosted_score = if document.favorite {
                    hit.similarity * self.favorite_boost
                } else {
                    hit.similarity
                };

                RankedResult {
                    document,
                    score: hit.similarity,
                    boosted_score,
                }
            })
            .collect();

        log::debug!("Kept {} of {} store hits", results.len(), total);

        Ok(results)
    }
}

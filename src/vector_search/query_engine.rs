use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::corpus::Corpus;
use super::embedding_store::EmbeddingStore;
use super::vectorizer::{embed_with, PoolingDivisor};
use crate::errors::SearchError;

/// Result limit used by the original deployment.
pub const DEFAULT_RESULT_LIMIT: usize = 5;

/// Distance reported when either vector has zero magnitude. It is the top of
/// the cosine distance range, so such documents rank last.
pub const MAX_COSINE_DISTANCE: f32 = 2.0;

/// One ranked document, produced fresh for every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub title: String,
    pub snippet: String,
    pub distance: f32,
}

/// Ranks a fixed corpus against free-text queries.
///
/// Holds only shared immutable data, so `search` can run from many tasks at
/// once without locking.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: Arc<EmbeddingStore>,
    corpus: Arc<Corpus>,
    result_limit: usize,
    pooling_divisor: PoolingDivisor,
}

impl QueryEngine {
    pub fn new(
        store: Arc<EmbeddingStore>,
        corpus: Arc<Corpus>,
        result_limit: usize,
        pooling_divisor: PoolingDivisor,
    ) -> Self {
        Self {
            store,
            corpus,
            result_limit,
            pooling_divisor,
        }
    }

    pub fn result_limit(&self) -> usize {
        self.result_limit
    }

    /// Return the `result_limit` documents closest to `query`, nearest first.
    /// Documents at equal distance keep their corpus order.
    pub fn search(&self, query: &str) -> Result<Vec<RankedResult>, SearchError> {
        self.search_with_limit(query, self.result_limit)
    }

    pub fn search_with_limit(&self, query: &str, limit: usize) -> Result<Vec<RankedResult>, SearchError> {
        let query_vector = embed_with(&self.store, query, self.pooling_divisor);

        let mut scored = self
            .corpus
            .iter()
            .map(|document| {
                cosine_distance(&query_vector, &document.vector).map(|distance| (distance, document))
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        // `sort_by` is stable, which keeps ties in corpus order.
        scored.sort_by(|(left, _), (right, _)| left.total_cmp(right));

        debug!("Ranked {} documents for query {:?}", scored.len(), query);

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(distance, document)| RankedResult {
                title: document.title.clone(),
                snippet: document.snippet.clone(),
                distance,
            })
            .collect())
    }
}

/// `1 - cos(a, b)`, or [`MAX_COSINE_DISTANCE`] when either side has zero
/// magnitude.
///
/// `a` is the reference vector: on a length mismatch its length is the
/// expected dimension and `b`'s is the one found.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f32, SearchError> {
    if a.len() != b.len() {
        return Err(SearchError::DimensionMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return Ok(MAX_COSINE_DISTANCE);
    }

    Ok(1.0 - dot / denominator)
}

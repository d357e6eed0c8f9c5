use serde::{Deserialize, Serialize};

use super::embedding_store::{EmbeddingStore, EmbeddingVector};
use super::tokenizer::{sentences, tokens};

/// Denominator applied to the summed token vectors.
///
/// `Dimension` divides by the vector length D, which is what deployed
/// indexes were built with. `TokenCount` is ordinary mean pooling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolingDivisor {
    #[default]
    Dimension,
    TokenCount,
}

impl std::str::FromStr for PoolingDivisor {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "dimension" => Ok(PoolingDivisor::Dimension),
            "token_count" | "tokens" => Ok(PoolingDivisor::TokenCount),
            other => Err(format!("unknown pooling divisor: {}", other)),
        }
    }
}

/// Embed `text` with the default [`PoolingDivisor::Dimension`] divisor.
pub fn embed(store: &EmbeddingStore, text: &str) -> EmbeddingVector {
    embed_with(store, text, PoolingDivisor::default())
}

/// Sum the vectors of every token of `text` found in `store`, then divide by
/// `divisor`. Unknown tokens are ignored; with no known token the result is
/// the zero vector.
pub fn embed_with(store: &EmbeddingStore, text: &str, divisor: PoolingDivisor) -> EmbeddingVector {
    let dimension = store.dimension();
    let mut sum = vec![0.0f32; dimension];
    let mut matched = 0usize;

    let known = sentences(text)
        .into_iter()
        .flat_map(|sentence| tokens(&sentence))
        .filter_map(|token| store.get(&token));

    for vector in known {
        for (acc, value) in sum.iter_mut().zip(vector) {
            *acc += value;
        }
        matched += 1;
    }

    let denominator = match divisor {
        PoolingDivisor::Dimension => dimension,
        PoolingDivisor::TokenCount => matched,
    };

    if denominator > 0 {
        let denominator = denominator as f32;
        for value in &mut sum {
            *value /= denominator;
        }
    }

    sum
}

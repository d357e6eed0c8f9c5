pub mod embedding_store;
pub mod tokenizer;
pub mod vectorizer;
pub mod corpus;
pub mod query_engine;

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::errors::LoadError;

// Re-export key types for convenience
pub use embedding_store::{EmbeddingStore, EmbeddingVector, DEFAULT_MAX_WORDS};
pub use tokenizer::{sentences, tokens};
pub use vectorizer::{embed, embed_with, PoolingDivisor};
pub use corpus::{Corpus, CorpusOptions, Document, DEFAULT_SNIPPET_LENGTH};
pub use query_engine::{cosine_distance, QueryEngine, RankedResult, DEFAULT_RESULT_LIMIT, MAX_COSINE_DISTANCE};

/// Everything needed to build a [`SemanticIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSettings {
    pub max_words: usize,
    /// Cross-check for the dimension read from the embedding file. `None`
    /// accepts whatever the file holds.
    pub dimension: Option<usize>,
    pub result_limit: usize,
    pub corpus: CorpusOptions,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
            dimension: None,
            result_limit: DEFAULT_RESULT_LIMIT,
            corpus: CorpusOptions::default(),
        }
    }
}

/// The result of initialization: the loaded vocabulary, the embedded corpus
/// and an engine over both. Cheap to clone and share between tasks.
#[derive(Debug, Clone)]
pub struct SemanticIndex {
    pub store: Arc<EmbeddingStore>,
    pub corpus: Arc<Corpus>,
    pub engine: QueryEngine,
}

/// Load the embeddings, then the corpus, with default settings for
/// everything but the vocabulary cap and the result limit.
pub fn initialize(
    embeddings_path: impl AsRef<Path>,
    max_words: usize,
    corpus_path: impl AsRef<Path>,
    result_limit: usize,
) -> Result<SemanticIndex, LoadError> {
    let settings = IndexSettings {
        max_words,
        result_limit,
        ..IndexSettings::default()
    };
    initialize_with(embeddings_path, corpus_path, &settings)
}

/// Blocking; run it on a blocking thread when called from async code.
pub fn initialize_with(
    embeddings_path: impl AsRef<Path>,
    corpus_path: impl AsRef<Path>,
    settings: &IndexSettings,
) -> Result<SemanticIndex, LoadError> {
    let store = Arc::new(EmbeddingStore::load(
        embeddings_path,
        settings.max_words,
        settings.dimension,
    )?);
    let corpus = Arc::new(Corpus::load(corpus_path, &store, &settings.corpus)?);
    let engine = QueryEngine::new(
        Arc::clone(&store),
        Arc::clone(&corpus),
        settings.result_limit,
        settings.corpus.pooling_divisor,
    );

    info!(
        "Index ready: {} words (D={}), {} documents, top {} results",
        store.len(),
        store.dimension(),
        corpus.len(),
        settings.result_limit
    );

    Ok(SemanticIndex { store, corpus, engine })
}

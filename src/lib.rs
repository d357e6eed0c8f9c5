//! Semantic document search over averaged word embeddings.
//!
//! A vocabulary of pretrained word vectors is loaded once, every document in
//! a corpus directory is reduced to one pooled vector, and queries are ranked
//! against those vectors by cosine distance.

pub mod config;
pub mod errors;
pub mod search_server;
pub mod security;
pub mod vector_search;

pub use errors::{LoadError, SearchError};
pub use vector_search::{initialize, initialize_with, IndexSettings, QueryEngine, RankedResult, SemanticIndex};

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::embedding_store::{EmbeddingStore, EmbeddingVector};
use super::vectorizer::{embed_with, PoolingDivisor};
use crate::errors::LoadError;

pub const DEFAULT_SNIPPET_LENGTH: usize = 240;

const ELLIPSIS: &str = "...";

/// One searchable file with its precomputed embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub vector: EmbeddingVector,
    pub snippet: String,
}

impl Document {
    /// Embed `content` and cut its display snippet.
    pub fn from_text(
        title: impl Into<String>,
        content: &str,
        store: &EmbeddingStore,
        options: &CorpusOptions,
    ) -> Self {
        Self {
            title: title.into(),
            vector: embed_with(store, content, options.pooling_divisor),
            snippet: snippet(content, options.snippet_length),
        }
    }
}

/// Knobs for building a corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusOptions {
    /// Maximum number of characters in a snippet, ellipsis excluded.
    pub snippet_length: usize,
    /// Order documents by file name instead of raw directory order.
    pub sort_by_file_name: bool,
    pub pooling_divisor: PoolingDivisor,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        Self {
            snippet_length: DEFAULT_SNIPPET_LENGTH,
            sort_by_file_name: true,
            pooling_divisor: PoolingDivisor::default(),
        }
    }
}

/// The fixed, ordered document set searched against.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    /// Read every file directly inside `folder` into a [`Document`].
    ///
    /// `folder` must be a directory. Subdirectories are skipped. Any file that
    /// cannot be read fails the whole load. Content is decoded as UTF-8 with
    /// invalid bytes replaced.
    pub fn load(
        folder: impl AsRef<Path>,
        store: &EmbeddingStore,
        options: &CorpusOptions,
    ) -> Result<Self, LoadError> {
        let folder = folder.as_ref();
        info!("Loading documents from {}", folder.display());

        let list_error = |source: io::Error| LoadError::ListCorpus {
            path: folder.to_path_buf(),
            source,
        };

        if !std::fs::metadata(folder).map_err(list_error)?.is_dir() {
            return Err(list_error(io::Error::new(
                io::ErrorKind::Other,
                "not a directory",
            )));
        }

        let mut walker = WalkDir::new(folder).follow_links(true).min_depth(1).max_depth(1);
        if options.sort_by_file_name {
            walker = walker.sort_by_file_name();
        }

        let mut documents = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|source| list_error(io::Error::from(source)))?;

            if entry.file_type().is_dir() {
                debug!("Skipping directory {}", entry.path().display());
                continue;
            }

            let bytes = std::fs::read(entry.path()).map_err(|source| LoadError::ReadDocument {
                path: entry.path().to_path_buf(),
                source,
            })?;
            let content = String::from_utf8_lossy(&bytes);
            let title = entry.file_name().to_string_lossy().into_owned();

            debug!("Embedded {} ({} bytes)", title, bytes.len());
            documents.push(Document::from_text(title, &content, store, options));
        }

        info!("Loaded {} documents", documents.len());
        Ok(Self { documents })
    }

    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Up to `max_chars` characters following the first line break (the whole
/// text when there is none), with an ellipsis appended.
pub fn snippet(content: &str, max_chars: usize) -> String {
    let body = match content.find('\n') {
        Some(line_break) => &content[line_break + 1..],
        None => content,
    };

    let mut excerpt: String = body.chars().take(max_chars).collect();
    excerpt.push_str(ELLIPSIS);
    excerpt
}

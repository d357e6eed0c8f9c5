use anyhow::Error;
use std::fmt;
use std::path::{Path, PathBuf};

/// Failures while building the embedding store or the corpus. All of them are
/// fatal to initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to open embedding file {path}: {source}")]
    OpenEmbeddings {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read embedding file {path} at line {line}: {source}")]
    ReadEmbeddings {
        path: PathBuf,
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Embedding file {path} holds {found}-dimensional vectors, expected {expected}")]
    UnexpectedDimension {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("Failed to list corpus directory {path}: {source}")]
    ListCorpus {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read corpus document {path}: {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    pub fn path(&self) -> &Path {
        match self {
            LoadError::OpenEmbeddings { path, .. }
            | LoadError::ReadEmbeddings { path, .. }
            | LoadError::UnexpectedDimension { path, .. }
            | LoadError::ListCorpus { path, .. }
            | LoadError::ReadDocument { path, .. } => path.as_path(),
        }
    }
}

/// Failures of a single query. They never poison the loaded index.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    #[error("Vector dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// User-friendly error types for better error messages
#[derive(Debug, Clone)]
pub enum UserError {
    EmbeddingsUnavailable(String),
    CorpusUnavailable(String),
    DocumentUnreadable(String),
    InvalidConfiguration(String),
    IndexNotReady,
    InconsistentIndex,
    PermissionDenied(String),
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserError::EmbeddingsUnavailable(path) => write!(
                f,
                "Cannot read the word embedding file: {}\n\
                 Set EMBEDDINGS_PATH or embeddings.path in the config file \
                 to a `.vec` text file (header line, then `word f1 ... fD`).",
                path
            ),
            UserError::CorpusUnavailable(path) => write!(
                f,
                "Cannot list the corpus directory: {}\n\
                 Set CORPUS_PATH or corpus.path to a directory of text documents.",
                path
            ),
            UserError::DocumentUnreadable(path) => write!(
                f,
                "Cannot read corpus document: {}\n\
                 Every file in the corpus directory must be readable; \
                 the index is not started with a partial corpus.",
                path
            ),
            UserError::InvalidConfiguration(msg) => write!(
                f,
                "Invalid configuration: {}\n\
                 Check your environment variables or config file.",
                msg
            ),
            UserError::IndexNotReady => write!(
                f,
                "The search index is still loading. Retry once loading has finished."
            ),
            UserError::InconsistentIndex => write!(
                f,
                "The index holds vectors of different dimensions.\n\
                 Rebuild the index from a single embedding file."
            ),
            UserError::PermissionDenied(action) => write!(
                f,
                "Permission denied: {}\n\
                 You don't have the necessary permissions for this operation.",
                action
            ),
        }
    }
}

impl std::error::Error for UserError {}

/// Convert internal errors to user-friendly messages
pub fn format_user_error(error: &Error) -> String {
    if let Some(user_error) = classify_user_error(error) {
        return user_error.to_string();
    }

    format!(
        "An error occurred: {:#}\n\n\
         If this error persists, please check:\n\
         - The embedding file and corpus directory exist\n\
         - Your configuration is correct\n\
         - You have necessary permissions",
        error
    )
}

fn classify_user_error(error: &Error) -> Option<UserError> {
    for cause in error.chain() {
        if let Some(user_error) = cause.downcast_ref::<UserError>() {
            return Some(user_error.clone());
        }

        if let Some(load_error) = cause.downcast_ref::<LoadError>() {
            let path = load_error.path().display().to_string();
            return Some(match load_error {
                LoadError::OpenEmbeddings { .. } | LoadError::ReadEmbeddings { .. } => {
                    UserError::EmbeddingsUnavailable(path)
                }
                LoadError::UnexpectedDimension { .. } => {
                    UserError::InvalidConfiguration(load_error.to_string())
                }
                LoadError::ListCorpus { .. } => UserError::CorpusUnavailable(path),
                LoadError::ReadDocument { .. } => UserError::DocumentUnreadable(path),
            });
        }

        if cause.downcast_ref::<SearchError>().is_some() {
            return Some(UserError::InconsistentIndex);
        }

        if let Some(io_error) = cause.downcast_ref::<std::io::Error>() {
            if io_error.kind() == std::io::ErrorKind::PermissionDenied {
                return Some(UserError::PermissionDenied(error.to_string()));
            }
        }
    }

    let error_string = error.to_string();
    if error_string.contains("config") || error_string.contains("environment") {
        return Some(UserError::InvalidConfiguration(error_string));
    }

    None
}

/// Create a user-friendly error payload for protocol responses
pub fn create_error_response(error: &Error) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "message": format_user_error(error),
            "type": classify_error(error),
            "recoverable": is_recoverable_error(error)
        }
    })
}

/// Classify error type for better handling
fn classify_error(error: &Error) -> &'static str {
    match classify_user_error(error) {
        Some(UserError::EmbeddingsUnavailable(_))
        | Some(UserError::CorpusUnavailable(_))
        | Some(UserError::DocumentUnreadable(_)) => "filesystem",
        Some(UserError::InvalidConfiguration(_)) => "configuration",
        Some(UserError::IndexNotReady) => "loading",
        Some(UserError::InconsistentIndex) => "index",
        Some(UserError::PermissionDenied(_)) => "permission",
        None => "unknown",
    }
}

/// Only a query rejected during loading succeeds when simply retried.
fn is_recoverable_error(error: &Error) -> bool {
    error
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<UserError>(), Some(UserError::IndexNotReady)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    fn missing_file_error() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory")
    }

    #[test]
    fn test_embeddings_error_formatting() {
        let error = Error::new(LoadError::OpenEmbeddings {
            path: PathBuf::from("models/missing.vec"),
            source: missing_file_error(),
        });
        let formatted = format_user_error(&error);
        assert!(formatted.contains("word embedding file"));
        assert!(formatted.contains("models/missing.vec"));
    }

    #[test]
    fn test_load_error_found_through_context() {
        let result: Result<(), LoadError> = Err(LoadError::ReadDocument {
            path: PathBuf::from("materials/broken.txt"),
            source: missing_file_error(),
        });
        let error = result.context("initializing index").unwrap_err();
        let formatted = format_user_error(&error);
        assert!(formatted.contains("Cannot read corpus document"));
        assert_eq!(classify_error(&error), "filesystem");
    }

    #[test]
    fn test_dimension_mismatch_formatting() {
        let error = Error::new(SearchError::DimensionMismatch { expected: 300, found: 2 });
        assert!(format_user_error(&error).contains("different dimensions"));
        assert_eq!(classify_error(&error), "index");
    }

    #[test]
    fn test_unexpected_dimension_is_configuration_error() {
        let error = Error::new(LoadError::UnexpectedDimension {
            path: PathBuf::from("models/wiki.en.vec"),
            expected: 300,
            found: 2,
        });
        assert_eq!(classify_error(&error), "configuration");
        assert!(format_user_error(&error).contains("expected 300"));
    }

    #[test]
    fn test_error_classification() {
        let config_error = anyhow::anyhow!("Failed to parse config file: config/search_config.toml");
        assert_eq!(classify_error(&config_error), "configuration");

        let other = anyhow::anyhow!("something unexpected");
        assert_eq!(classify_error(&other), "unknown");
        assert!(format_user_error(&other).contains("An error occurred"));
    }

    #[test]
    fn test_not_ready_is_recoverable() {
        let error = Error::new(UserError::IndexNotReady);
        let response = create_error_response(&error);
        assert_eq!(response["error"]["type"], "loading");
        assert_eq!(response["error"]["recoverable"], true);

        let fatal = Error::new(SearchError::DimensionMismatch { expected: 3, found: 2 });
        assert_eq!(create_error_response(&fatal)["error"]["recoverable"], false);
    }
}

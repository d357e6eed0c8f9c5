use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::errors::LoadError;

/// A fixed-length word or document embedding.
pub type EmbeddingVector = Vec<f32>;

/// Vocabulary cap used by the original deployment.
pub const DEFAULT_MAX_WORDS: usize = 20_000;

/// Immutable word → vector mapping loaded from a `.vec` text file.
///
/// Every vector holds exactly [`EmbeddingStore::dimension`] components and the
/// store never holds more than the `max_words` it was loaded with.
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    vectors: HashMap<String, EmbeddingVector>,
    dimension: usize,
}

impl EmbeddingStore {
    /// Load at most `max_words` vectors from `path`.
    ///
    /// The file is streamed line by line. The first line is a header and is
    /// skipped. The dimension D is the float count of the first data line;
    /// loading ends quietly at the first line that does not carry exactly D
    /// floats and everything read before it is kept.
    ///
    /// `expected_dimension` is a cross-check only: when set and the file's D
    /// differs, the load fails instead of serving vectors of the wrong size.
    pub fn load(
        path: impl AsRef<Path>,
        max_words: usize,
        expected_dimension: Option<usize>,
    ) -> Result<Self, LoadError> {
        let path = path.as_ref();
        info!("Loading word vectors from {}", path.display());

        let file = File::open(path).map_err(|source| LoadError::OpenEmbeddings {
            path: path.to_path_buf(),
            source,
        })?;

        let mut store = Self::from_reader(BufReader::new(file), max_words).map_err(
            |(line, source)| LoadError::ReadEmbeddings {
                path: path.to_path_buf(),
                line,
                source,
            },
        )?;

        if let Some(expected) = expected_dimension {
            if store.is_empty() {
                store.dimension = expected;
            } else if store.dimension != expected {
                return Err(LoadError::UnexpectedDimension {
                    path: path.to_path_buf(),
                    expected,
                    found: store.dimension,
                });
            }
        }

        if store.is_empty() {
            warn!("No word vectors loaded from {}", path.display());
        }

        info!("Model loaded with {} words of dimension {}", store.len(), store.dimension);
        Ok(store)
    }

    /// Load from any buffered reader in the `.vec` text format, taking D from
    /// the first data line. An empty store falls back to the header's second
    /// field, or 0 when the header carries none.
    ///
    /// On a read failure the 1-based line number is returned with the error.
    pub fn from_reader<R: BufRead>(
        reader: R,
        max_words: usize,
    ) -> Result<Self, (usize, std::io::Error)> {
        let mut lines = reader.lines().enumerate();
        let header_dimension = match lines.next() {
            Some((_, Ok(header))) => header
                .split_whitespace()
                .nth(1)
                .and_then(|field| field.parse::<usize>().ok()),
            Some((index, Err(error))) => return Err((index + 1, error)),
            None => None,
        };

        let mut vectors = HashMap::new();
        let mut ingested = 0usize;
        let mut dimension: Option<usize> = None;
        let mut read_error = None;

        let entries = lines
            .map_while(|(index, line)| match line {
                Ok(line) => Some((index + 1, line)),
                Err(error) => {
                    read_error = Some((index + 1, error));
                    None
                }
            })
            .map(|(line_number, line)| (line_number, parse_vector_line(&line)))
            .take_while(|(line_number, parsed)| {
                if dimension.is_none() {
                    dimension = parsed.as_ref().map(|(_, vector)| vector.len());
                }
                let keep = should_ingest(ingested, max_words, dimension, parsed.as_ref());
                if keep {
                    ingested += 1;
                } else if ingested < max_words {
                    debug!("Stopping at malformed vector line {}", line_number);
                }
                keep
            })
            .filter_map(|(_, parsed)| parsed);

        for (word, vector) in entries {
            vectors.insert(word, vector);
        }

        if let Some(failure) = read_error {
            return Err(failure);
        }

        let dimension = if vectors.is_empty() {
            header_dimension.unwrap_or(0)
        } else {
            dimension.unwrap_or(0)
        };

        Ok(Self { vectors, dimension })
    }

    /// Build a store from in-memory entries. Entries whose length differs
    /// from `dimension` are dropped.
    pub fn from_entries<I, S>(entries: I, dimension: usize) -> Self
    where
        I: IntoIterator<Item = (S, EmbeddingVector)>,
        S: Into<String>,
    {
        let vectors = entries
            .into_iter()
            .filter(|(_, vector)| vector.len() == dimension)
            .map(|(word, vector)| (word.into(), vector))
            .collect();

        Self { vectors, dimension }
    }

    pub fn get(&self, word: &str) -> Option<&EmbeddingVector> {
        self.vectors.get(word)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.vectors.contains_key(word)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.vectors.keys().map(String::as_str)
    }
}

/// Ingestion continues only while the cap has not been reached and the
/// current line parsed into a vector of the store's dimension.
fn should_ingest(
    ingested: usize,
    max_words: usize,
    dimension: Option<usize>,
    parsed: Option<&(String, EmbeddingVector)>,
) -> bool {
    ingested < max_words
        && matches!(parsed, Some((_, vector)) if Some(vector.len()) == dimension)
}

/// `None` when the line is not `<word> <f1> ... <fn>` with at least one float.
fn parse_vector_line(line: &str) -> Option<(String, EmbeddingVector)> {
    let mut fields = line.split_whitespace();
    let word = fields.next()?;

    let vector = fields
        .map(|field| field.parse::<f32>().ok())
        .collect::<Option<EmbeddingVector>>()?;

    (!vector.is_empty()).then(|| (word.to_string(), vector))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn load(source: &str, max_words: usize) -> EmbeddingStore {
        EmbeddingStore::from_reader(Cursor::new(source), max_words).unwrap()
    }

    #[test]
    fn test_header_is_skipped() {
        let store = load("cat 1 0\ndog 0 1\n", 10);
        assert_eq!(store.len(), 1);
        assert!(!store.contains("cat"));
        assert_eq!(store.get("dog"), Some(&vec![0.0, 1.0]));
    }

    #[test]
    fn test_every_vector_has_dimension() {
        let store = load("3 3\nthe 0.1 0.2 0.3\nof -0.5 0.25 1e-3\nand 1 2 3\n", 10);
        assert_eq!(store.len(), 3);
        assert_eq!(store.dimension(), 3);
        assert!(store.words().all(|word| store.get(word).unwrap().len() == 3));
    }

    #[test]
    fn test_dimension_comes_from_first_data_line() {
        // The header claims 300; the data is two-dimensional.
        let store = load("2 300\ncat 1 0\ndog 0 1\n", 10);
        assert_eq!(store.dimension(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_stops_at_max_words() {
        let store = load("4 2\na 1 0\nb 0 1\nc 1 1\nd 2 2\n", 2);
        assert_eq!(store.len(), 2);
        assert!(store.contains("a"));
        assert!(store.contains("b"));
        assert!(!store.contains("c"));
    }

    #[test]
    fn test_zero_max_words_loads_nothing() {
        let store = load("1 2\na 1 0\n", 0);
        assert!(store.is_empty());
        assert_eq!(store.dimension(), 2);
    }

    #[test]
    fn test_short_line_halts_loading() {
        let store = load("4 2\na 1 0\nbroken 1\nc 1 1\n", 10);
        assert_eq!(store.len(), 1);
        assert!(store.contains("a"));
        assert!(!store.contains("broken"));
        assert!(!store.contains("c"));
    }

    #[test]
    fn test_long_line_halts_loading() {
        let store = load("3 2\na 1 0\nb 1 0 5\nc 1 1\n", 10);
        assert_eq!(store.words().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_unparsable_field_halts_loading() {
        let store = load("3 2\na 1 0\nb 1 oops\nc 1 1\n", 10);
        assert_eq!(store.len(), 1);
        assert!(!store.contains("c"));
    }

    #[test]
    fn test_word_without_floats_halts_loading() {
        let store = load("2 2\nlonely\na 1 0\n", 10);
        assert!(store.is_empty());
        assert_eq!(store.dimension(), 2);
    }

    #[test]
    fn test_trailing_whitespace_is_tolerated() {
        let store = load("1 2\nword 0.5 -0.5 \n", 10);
        assert_eq!(store.get("word"), Some(&vec![0.5, -0.5]));
    }

    #[test]
    fn test_words_are_case_sensitive() {
        let store = load("2 2\nParis 1 0\nparis 0 1\n", 10);
        assert_eq!(store.get("Paris"), Some(&vec![1.0, 0.0]));
        assert_eq!(store.get("paris"), Some(&vec![0.0, 1.0]));
    }

    #[test]
    fn test_duplicate_word_overwrites() {
        let store = load("2 2\ncat 1 0\ncat 0 1\n", 10);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("cat"), Some(&vec![0.0, 1.0]));
    }

    #[test]
    fn test_empty_source() {
        let store = load("", 10);
        assert!(store.is_empty());
        assert_eq!(store.dimension(), 0);

        let store = load("0 2\n", 10);
        assert!(store.is_empty());
        assert_eq!(store.dimension(), 2);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let result = EmbeddingStore::load("does/not/exist.vec", 10, None);
        assert!(matches!(result, Err(LoadError::OpenEmbeddings { .. })));
    }

    #[test]
    fn test_expected_dimension_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.vec");
        std::fs::write(&path, "2 2\ncat 1 0\ndog 0 1\n").unwrap();

        let store = EmbeddingStore::load(&path, 10, Some(2)).unwrap();
        assert_eq!(store.dimension(), 2);

        let result = EmbeddingStore::load(&path, 10, Some(300));
        assert!(matches!(
            result,
            Err(LoadError::UnexpectedDimension { expected: 300, found: 2, .. })
        ));
    }

    #[test]
    fn test_expected_dimension_applies_to_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header_only.vec");
        std::fs::write(&path, "0 0\n").unwrap();

        let store = EmbeddingStore::load(&path, 10, Some(4)).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.dimension(), 4);
    }

    #[test]
    fn test_from_entries_drops_wrong_length() {
        let store = EmbeddingStore::from_entries(
            vec![("cat", vec![1.0, 0.0]), ("dog", vec![0.0, 1.0, 0.0])],
            2,
        );
        assert_eq!(store.len(), 1);
        assert!(store.contains("cat"));
    }
}

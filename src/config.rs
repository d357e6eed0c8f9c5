use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::vector_search::{
    CorpusOptions, IndexSettings, PoolingDivisor, DEFAULT_MAX_WORDS,
    DEFAULT_RESULT_LIMIT, DEFAULT_SNIPPET_LENGTH,
};

/// Server configuration with environment variable support
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub embeddings: EmbeddingsConfig,
    pub corpus: CorpusConfig,
    pub search: SearchConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    pub path: PathBuf,
    pub max_words: usize,
    /// Expected vector length. The file decides D; this only checks it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub path: PathBuf,
    pub snippet_length: usize,
    pub sort_by_file_name: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub result_limit: usize,
    pub pooling_divisor: PoolingDivisor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub secret_key_path: PathBuf,
    pub require_authentication: bool,
}

impl Config {
    /// Load configuration from environment variables with fallback to config file
    pub fn load() -> Result<Self> {
        // First, try to load .env file if it exists
        if Path::new(".env").exists() {
            dotenv::dotenv().ok();
            debug!("Loaded .env file");
        }

        let config_path = env::var("CONFIG_PATH")
            .unwrap_or_else(|_| "config/search_config.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        config.override_from_env();
        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from TOML file
    fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))
    }

    /// Override configuration values from environment variables
    fn override_from_env(&mut self) {
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.server.log_level = val;
        }

        // Embeddings
        if let Ok(val) = env::var("EMBEDDINGS_PATH") {
            self.embeddings.path = PathBuf::from(val);
        }
        if let Ok(val) = env::var("EMBEDDINGS_MAX_WORDS") {
            if let Ok(num) = val.parse() {
                self.embeddings.max_words = num;
            }
        }
        if let Ok(val) = env::var("EMBEDDINGS_DIMENSION") {
            if let Ok(num) = val.parse() {
                self.embeddings.dimension = Some(num);
            }
        }

        // Corpus
        if let Ok(val) = env::var("CORPUS_PATH") {
            self.corpus.path = PathBuf::from(val);
        }
        if let Ok(val) = env::var("SNIPPET_LENGTH") {
            if let Ok(num) = val.parse() {
                self.corpus.snippet_length = num;
            }
        }

        // Search
        if let Ok(val) = env::var("RESULT_LIMIT") {
            if let Ok(num) = val.parse() {
                self.search.result_limit = num;
            }
        }
        if let Ok(val) = env::var("POOLING_DIVISOR") {
            if let Ok(divisor) = val.parse() {
                self.search.pooling_divisor = divisor;
            }
        }

        // Auth
        if let Ok(val) = env::var("SECRET_KEY_PATH") {
            self.auth.secret_key_path = PathBuf::from(val);
        }
        if let Ok(val) = env::var("REQUIRE_AUTHENTICATION") {
            self.auth.require_authentication = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.embeddings.max_words == 0 {
            return Err(anyhow::anyhow!("embeddings max_words must be greater than 0"));
        }

        if self.embeddings.dimension == Some(0) {
            return Err(anyhow::anyhow!("embeddings dimension must be greater than 0"));
        }

        if self.corpus.snippet_length == 0 {
            return Err(anyhow::anyhow!("corpus snippet_length must be greater than 0"));
        }

        if self.search.result_limit == 0 {
            return Err(anyhow::anyhow!("search result_limit must be greater than 0"));
        }

        if self.auth.require_authentication && self.auth.secret_key_path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!(
                "A secret key file is required. Set SECRET_KEY_PATH environment variable."
            ));
        }

        Ok(())
    }

    /// Settings for building the search index
    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            max_words: self.embeddings.max_words,
            dimension: self.embeddings.dimension,
            result_limit: self.search.result_limit,
            corpus: CorpusOptions {
                snippet_length: self.corpus.snippet_length,
                sort_by_file_name: self.corpus.sort_by_file_name,
                pooling_divisor: self.search.pooling_divisor,
            },
        }
    }

    /// Get a summary of the configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Config: Embeddings={} (max {} words, D={}), Corpus={}, TopK={}, Pooling={:?}, Auth={}, LogLevel={}",
            self.embeddings.path.display(),
            self.embeddings.max_words,
            self.embeddings
                .dimension
                .map_or_else(|| "from file".to_string(), |d| d.to_string()),
            self.corpus.path.display(),
            self.search.result_limit,
            self.search.pooling_divisor,
            self.auth.require_authentication,
            self.server.log_level
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "semantic-search".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                log_level: "info".to_string(),
            },
            embeddings: EmbeddingsConfig {
                path: PathBuf::from("./models/wiki.en.align.partial.vec"),
                max_words: DEFAULT_MAX_WORDS,
                dimension: None,
            },
            corpus: CorpusConfig {
                path: PathBuf::from("./materials/"),
                snippet_length: DEFAULT_SNIPPET_LENGTH,
                sort_by_file_name: true,
            },
            search: SearchConfig {
                result_limit: DEFAULT_RESULT_LIMIT,
                pooling_divisor: PoolingDivisor::Dimension,
            },
            auth: AuthConfig {
                secret_key_path: PathBuf::from("secret.key"),
                require_authentication: true,
            },
        }
    }
}

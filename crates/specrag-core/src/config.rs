//! specrag Configuration Management
//!
//! Handles configuration from environment variables and config files with
//! sensible defaults for development. All components receive their settings
//! explicitly from these structs; there is no ambient global state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Document source (GitHub repository)
    pub source: SourceConfig,

    /// Vector store and index settings
    pub vector: VectorConfig,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// RAG pipeline configuration
    pub rag: RagConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Document source
        if let Ok(owner) = std::env::var("GITHUB_REPO_OWNER") {
            config.source.owner = owner;
        }
        if let Ok(repo) = std::env::var("GITHUB_REPO_NAME") {
            config.source.repo = repo;
        }
        if let Ok(token) = std::env::var("GITHUB_PAT") {
            config.source.token = Some(token);
        }
        if let Ok(root) = std::env::var("CONTENT_ROOT") {
            config.source.content_root = root;
        }

        // Vector store
        if let Ok(url) = std::env::var("QDRANT_URL") {
            config.vector.url = url;
        }
        if let Ok(collection) = std::env::var("QDRANT_COLLECTION") {
            config.vector.collection = collection;
        }
        if let Ok(name) = std::env::var("INDEX_NAME") {
            config.vector.index_name = name;
        }
        if let Ok(path) = std::env::var("EMBEDDING_PATH") {
            config.vector.embedding_path = path;
        }
        if let Ok(dim) = std::env::var("VECTOR_DIMENSION") {
            config.vector.dimension = dim.parse().map_err(|_| ConfigError::InvalidValue {
                key: "VECTOR_DIMENSION".to_string(),
                value: dim,
            })?;
        }
        if let Ok(similarity) = std::env::var("SIMILARITY_METRIC") {
            config.vector.similarity = similarity;
        }

        // LLM
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider.parse()?;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.llm.openai_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            config.llm.openai_base_url = Some(url);
        }
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            config.llm.ollama_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }

        // RAG pipeline
        if let Ok(size) = std::env::var("CHUNK_SIZE") {
            config.rag.chunk_size = size.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CHUNK_SIZE".to_string(),
                value: size,
            })?;
        }
        if let Ok(overlap) = std::env::var("CHUNK_OVERLAP") {
            config.rag.chunk_overlap = overlap.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CHUNK_OVERLAP".to_string(),
                value: overlap,
            })?;
        }
        if let Ok(num) = std::env::var("NUM_DOCS") {
            config.rag.num_docs = num.parse().map_err(|_| ConfigError::InvalidValue {
                key: "NUM_DOCS".to_string(),
                value: num,
            })?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }
}

/// Document source configuration (GitHub contents API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// API base, e.g. "https://api.github.com/repos"
    pub api_base: String,

    /// Repository owner
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Bearer token for the contents API (passed through opaquely)
    pub token: Option<String>,

    /// Path segment a file must contain to be retained
    pub content_root: String,

    /// Path marker that excludes a file (test fixtures)
    pub exclude_marker: String,

    /// File extension to retain
    pub extension: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com/repos".to_string(),
            owner: "mongodb".to_string(),
            repo: "specifications".to_string(),
            token: None,
            content_root: "source/".to_string(),
            exclude_marker: "test".to_string(),
            extension: ".md".to_string(),
        }
    }
}

/// Vector store and index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Qdrant gRPC URL
    pub url: String,

    /// Collection name
    pub collection: String,

    /// Named vector index
    pub index_name: String,

    /// Embedding field path within a record
    pub embedding_path: String,

    /// Vector dimension (must match the embedding model)
    pub dimension: usize,

    /// Similarity metric: "dotProduct", "cosine", or "euclidean"
    pub similarity: String,

    /// Seconds between index readiness polls
    pub poll_interval_secs: u64,

    /// Deadline for the index to become queryable
    pub ready_timeout_secs: u64,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            collection: "specs".to_string(),
            index_name: "vector_index_dotProduct_1536".to_string(),
            embedding_path: "spec_embedding".to_string(),
            dimension: 1536, // text-embedding-3-small
            similarity: "dotProduct".to_string(),
            poll_interval_secs: 5,
            ready_timeout_secs: 600,
        }
    }
}

impl VectorConfig {
    /// The index specification this configuration describes
    pub fn index_spec(&self) -> crate::IndexSpec {
        crate::IndexSpec {
            name: self.index_name.clone(),
            path: self.embedding_path.clone(),
            dimensions: self.dimension,
            similarity: self.similarity.clone(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider to use
    pub provider: LlmProvider,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for Azure or compatible APIs)
    pub openai_base_url: Option<String>,

    /// Ollama server URL
    pub ollama_url: String,

    /// Generation model name
    pub model: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Fixed sampling temperature for the ask pipeline
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            openai_api_key: None,
            openai_base_url: None,
            ollama_url: "http://localhost:11434".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            max_tokens: 2048,
            temperature: 1.0,
            timeout_secs: 60,
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAI,
    Ollama,
    Azure,
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "azure" => Ok(Self::Azure),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// RAG pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Maximum chunk size: model tokens for the markdown chunker, words for
    /// the sentence chunker
    pub chunk_size: usize,

    /// Overlap carried between consecutive chunks of the same document
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per sub-question
    pub num_docs: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
            num_docs: 4,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

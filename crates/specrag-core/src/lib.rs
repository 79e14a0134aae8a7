//! specrag Core - Domain models, traits, and shared types
//!
//! This crate defines the abstractions used throughout the specrag pipeline:
//! - Corpus models (documents, chunks, scored retrieval results)
//! - Vector index descriptors
//! - Common error types
//! - Shared traits for vector stores and LLM clients
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, LlmConfig, LlmProvider, LoggingConfig, RagConfig, SourceConfig,
    VectorConfig,
};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Error taxonomy for the specrag pipeline
///
/// Every internal failure is wrapped with step context into one of these
/// variants and surfaced to the caller; none are silently swallowed.
#[derive(Error, Debug)]
pub enum SpecRagError {
    /// Document source unreachable, unauthorized, or non-OK status
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Malformed chunker input or splitter rejection
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// Index list/create failure, or deadline expired while waiting for
    /// the index to become queryable
    #[error("Index provisioning error: {0}")]
    IndexProvisioning(String),

    /// Embedding service call failure
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Similarity search failure
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Generation service call failure
    #[error("Generation error: {0}")]
    Generation(String),

    /// Vector store connection or collection failure
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SpecRagError>;

// ============================================================================
// Metadata Keys
// ============================================================================

/// Metadata key for the originating document name
pub const META_SOURCE: &str = "source";

/// Metadata key for the heading hierarchy path (structural chunking)
pub const META_HEADING: &str = "heading";

/// Metadata key for the chunk sequence number (sentence chunking)
pub const META_CHUNK_INDEX: &str = "chunk_index";

// ============================================================================
// Corpus Models
// ============================================================================

/// A retrieval-sized unit of document text plus metadata.
///
/// Chunks are immutable value objects produced once per sync run and
/// superseded wholesale by the next run. Metadata always carries at least
/// the `source` key; the text is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text content
    pub text: String,

    /// Positional and provenance metadata
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(text: impl Into<String>, metadata: HashMap<String, String>) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// Originating document name, if present
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(META_SOURCE).map(String::as_str)
    }

    /// Heading hierarchy path, if present
    pub fn heading(&self) -> Option<&str> {
        self.metadata.get(META_HEADING).map(String::as_str)
    }
}

/// A document fetched from the external source, keyed by repository path.
///
/// Documents are fetched fresh each sync and are not persisted independently
/// of their derived chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Path within the source repository
    pub path: String,

    /// Raw text content
    pub content: String,
}

impl Document {
    /// Create a new document
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Final path segment, used as the `source` metadata value
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A retrieval result: a chunk paired with its similarity score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

// ============================================================================
// Vector Index Descriptors
// ============================================================================

/// Specification for a named vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name
    pub name: String,

    /// Embedding field path
    pub path: String,

    /// Vector dimensionality (must match the embedding model)
    pub dimensions: usize,

    /// Similarity metric (e.g. "dotProduct", "cosine", "euclidean")
    pub similarity: String,
}

/// An existing index as reported by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name
    pub name: String,

    /// Whether the index is ready to serve similarity search
    pub queryable: bool,
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for vector stores backing the retrieval pipeline
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and insert chunks; a failure for any subset fails the whole
    /// insert. Returns the number of records inserted.
    async fn add_chunks(&self, chunks: &[Chunk]) -> Result<usize>;

    /// Similarity search for a query string, returning up to `k` scored
    /// chunks in descending score order
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>>;

    /// Delete every record in the collection, returning the count removed
    /// when the backend reports one
    async fn delete_all(&self) -> Result<u64>;
}

/// Trait for LLM generation clients
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for the prompt at the given sampling temperature
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_metadata_accessors() {
        let mut metadata = HashMap::new();
        metadata.insert(META_SOURCE.to_string(), "auth.md".to_string());
        metadata.insert(META_HEADING.to_string(), "Auth > SCRAM".to_string());

        let chunk = Chunk::new("Clients MUST authenticate.", metadata);

        assert_eq!(chunk.source(), Some("auth.md"));
        assert_eq!(chunk.heading(), Some("Auth > SCRAM"));
    }

    #[test]
    fn test_chunk_without_heading() {
        let mut metadata = HashMap::new();
        metadata.insert(META_SOURCE.to_string(), "auth.md".to_string());

        let chunk = Chunk::new("text", metadata);
        assert!(chunk.heading().is_none());
    }

    #[test]
    fn test_document_file_name() {
        let doc = Document::new("source/auth/auth.md", "content");
        assert_eq!(doc.file_name(), "auth.md");

        let flat = Document::new("README.md", "content");
        assert_eq!(flat.file_name(), "README.md");
    }

    #[test]
    fn test_error_display_includes_step_context() {
        let err = SpecRagError::Fetch("status 403".to_string());
        assert_eq!(err.to_string(), "Fetch error: status 403");

        let err = SpecRagError::IndexProvisioning("deadline expired".to_string());
        assert!(err.to_string().contains("Index provisioning"));
    }
}

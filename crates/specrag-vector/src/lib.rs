//! specrag Vector - Embedding generation and vector-index lifecycle
//!
//! This crate covers everything between chunk text and similarity search:
//! - `EmbeddingClient` implementations for OpenAI and Ollama
//! - The `IndexManager`, which guarantees the backing collection and its
//!   named vector index exist and are queryable before any read or write
//! - `QdrantStore`, the qdrant-backed `VectorStore` implementation
//! - A moka-backed cache for query-text embeddings

pub mod cache;
pub mod embedding;
pub mod index;
pub mod qdrant_store;

pub use cache::{CacheStatsReport, EmbeddingCache};
pub use embedding::{create_embedding_client, EmbeddingClient, OllamaEmbedding, OpenAiEmbedding};
pub use index::{IndexManager, SearchIndexOps};
pub use qdrant_store::QdrantStore;

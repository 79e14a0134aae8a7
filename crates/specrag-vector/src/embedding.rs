//! Embedding clients for chunk and query text
//!
//! OpenAI's batch endpoint and Ollama's per-text endpoint behind one
//! trait. Dimensionality is looked up from the model name and can be
//! overridden when a deployment serves a model under a custom name; the
//! store reconciles it against the configured collection dimension.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use specrag_core::{LlmConfig, LlmProvider, Result, SpecRagError};

/// Trait for embedding generation
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embedding dimension
    fn dimension(&self) -> usize;
}

/// Dimensionality of the models this pipeline is expected to run against
fn model_dimension(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        "nomic-embed-text" => Some(768),
        "mxbai-embed-large" => Some(1024),
        "all-minilm" => Some(384),
        _ => None,
    }
}

// ============================================================================
// OpenAI
// ============================================================================

/// OpenAI embeddings-endpoint client
pub struct OpenAiEmbedding {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct BatchRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiEmbedding {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimension = model_dimension(&model).unwrap_or(1536);

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model,
            dimension,
        }
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| SpecRagError::Config("OpenAI API key required".to_string()))?;

        let mut client = Self::new(api_key.clone(), config.embedding_model.clone());
        if let Some(base_url) = &config.openai_base_url {
            client.base_url = base_url.clone();
        }

        Ok(client)
    }

    /// Override the dimension reported for models the lookup table does
    /// not know (custom deployments, renamed models)
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| SpecRagError::Embedding("no embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = BatchRequest {
            input: texts.to_vec(),
            model: self.model.clone(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| SpecRagError::Embedding(format!("embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SpecRagError::Embedding(format!(
                "OpenAI embedding error: {error_text}"
            )));
        }

        let result: BatchResponse = response.json().await.map_err(|e| {
            SpecRagError::Embedding(format!("failed to parse embedding response: {e}"))
        })?;

        // The API may reorder rows; restore input order by index.
        let mut rows = result.data;
        rows.sort_by_key(|row| row.index);

        Ok(rows.into_iter().map(|row| row.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Ollama
// ============================================================================

/// Ollama embeddings-endpoint client
pub struct OllamaEmbedding {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OllamaEmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedding {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimension = model_dimension(&model).unwrap_or(768);

        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model,
            dimension,
        }
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(config.ollama_url.clone(), config.embedding_model.clone())
    }

    /// Override the dimension reported for unknown models
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = OllamaEmbedRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                SpecRagError::Embedding(format!("Ollama embedding request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SpecRagError::Embedding(format!(
                "Ollama embedding error: {error_text}"
            )));
        }

        let result: OllamaEmbedResponse = response.json().await.map_err(|e| {
            SpecRagError::Embedding(format!("failed to parse embedding response: {e}"))
        })?;

        Ok(result.embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Ollama has no native batch embedding; process sequentially
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Create an embedding client from config
pub fn create_embedding_client(config: &LlmConfig) -> Result<Box<dyn EmbeddingClient>> {
    match config.provider {
        LlmProvider::OpenAI | LlmProvider::Azure => {
            Ok(Box::new(OpenAiEmbedding::from_config(config)?))
        }
        LlmProvider::Ollama => Ok(Box::new(OllamaEmbedding::from_config(config))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_dimension_lookup() {
        assert_eq!(model_dimension("text-embedding-3-small"), Some(1536));
        assert_eq!(model_dimension("text-embedding-3-large"), Some(3072));
        assert_eq!(model_dimension("nomic-embed-text"), Some(768));
        assert_eq!(model_dimension("my-finetune"), None);
    }

    #[test]
    fn test_clients_report_model_dimension() {
        let openai = OpenAiEmbedding::new("test-key", "text-embedding-3-large");
        assert_eq!(openai.dimension(), 3072);

        let ollama = OllamaEmbedding::new("http://localhost:11434", "mxbai-embed-large");
        assert_eq!(ollama.dimension(), 1024);
    }

    #[test]
    fn test_dimension_override_for_unknown_model() {
        let client = OpenAiEmbedding::new("test-key", "my-finetune").with_dimension(512);
        assert_eq!(client.dimension(), 512);

        let client = OllamaEmbedding::new("http://localhost:11434", "my-finetune");
        assert_eq!(client.dimension(), 768);
    }

    #[test]
    fn test_factory_requires_openai_key() {
        let config = LlmConfig::default();
        assert!(create_embedding_client(&config).is_err());
    }
}

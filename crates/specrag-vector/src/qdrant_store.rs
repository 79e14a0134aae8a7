//! Qdrant implementation of the vector store
//!
//! Stores one point per chunk: the payload holds the chunk text and
//! metadata, and the embedding lives in a named vector keyed by the
//! configured embedding field path. Qdrant builds its vector index
//! alongside the collection, so the collection-with-vector-field creation
//! is the index create request, and "queryable" maps to the collection
//! reporting green status.

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CollectionStatus, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    NamedVectors, PointStruct, ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder, VectorsConfigBuilder,
};
use qdrant_client::Qdrant;
use specrag_core::{
    Chunk, IndexDescriptor, IndexSpec, Result, ScoredChunk, SpecRagError, VectorConfig,
    VectorStore,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::EmbeddingCache;
use crate::embedding::EmbeddingClient;
use crate::index::SearchIndexOps;

/// Qdrant vector store
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    index_name: String,
    vector_name: String,
    dimension: usize,
    distance: Distance,
    embedder: Arc<dyn EmbeddingClient>,
    query_cache: EmbeddingCache,
}

impl std::fmt::Debug for QdrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantStore")
            .field("collection", &self.collection)
            .field("index_name", &self.index_name)
            .field("vector_name", &self.vector_name)
            .field("dimension", &self.dimension)
            .field("distance", &self.distance)
            .finish_non_exhaustive()
    }
}

impl QdrantStore {
    /// Create a new qdrant connection
    pub fn new(config: &VectorConfig, embedder: Arc<dyn EmbeddingClient>) -> Result<Self> {
        let client = Qdrant::from_url(&config.url)
            .build()
            .map_err(|e| SpecRagError::Store(format!("qdrant connection failed: {e}")))?;

        if embedder.dimension() != config.dimension {
            return Err(SpecRagError::Config(format!(
                "embedding model produces {}-dimensional vectors but the collection is configured for {}",
                embedder.dimension(),
                config.dimension
            )));
        }

        Ok(Self {
            client,
            collection: config.collection.clone(),
            index_name: config.index_name.clone(),
            vector_name: config.embedding_path.clone(),
            dimension: config.dimension,
            distance: parse_distance(&config.similarity)?,
            embedder,
            query_cache: EmbeddingCache::new(),
        })
    }

    async fn collection_exists(&self) -> Result<bool> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| SpecRagError::Store(format!("failed to list collections: {e}")))?;

        Ok(collections
            .collections
            .iter()
            .any(|c| c.name == self.collection))
    }

    /// Embed a query string, consulting the cache first
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        if let Some(vector) = self.query_cache.get(query).await {
            return Ok(vector);
        }
        let vector = self.embedder.embed(query).await?;
        self.query_cache.put(query, vector.clone()).await;
        Ok(vector)
    }
}

#[async_trait]
impl SearchIndexOps for QdrantStore {
    async fn ensure_collection(&self) -> Result<()> {
        if self.collection_exists().await? {
            return Ok(());
        }

        tracing::info!(collection = %self.collection, "creating vector store collection");

        let mut vectors = VectorsConfigBuilder::default();
        vectors.add_named_vector_params(
            &self.vector_name,
            VectorParamsBuilder::new(self.dimension as u64, self.distance),
        );

        match self
            .client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(vectors),
            )
            .await
        {
            Ok(_) => Ok(()),
            // Lost a create race; the collection being there is all we need.
            Err(e) if e.to_string().contains("already exists") => Ok(()),
            Err(e) => Err(SpecRagError::Store(format!(
                "failed to create collection: {e}"
            ))),
        }
    }

    async fn list_indexes(&self, name: &str) -> Result<Vec<IndexDescriptor>> {
        if name != self.index_name || !self.collection_exists().await? {
            return Ok(Vec::new());
        }

        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| SpecRagError::IndexProvisioning(format!("failed to get collection info: {e}")))?;

        let queryable = info
            .result
            .map(|r| r.status() == CollectionStatus::Green)
            .unwrap_or(false);

        Ok(vec![IndexDescriptor {
            name: self.index_name.clone(),
            queryable,
        }])
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<String> {
        // Qdrant has no separate index-create call: the vector index is
        // declared with the collection. ensure_collection issues it.
        self.ensure_collection().await?;
        Ok(spec.name.clone())
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn add_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let mut points = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.iter().zip(embeddings) {
            let payload: qdrant_client::Payload = serde_json::json!({
                "text": chunk.text,
                "metadata": chunk.metadata,
            })
            .try_into()
            .map_err(|e| SpecRagError::Store(format!("failed to build payload: {e}")))?;

            let vectors =
                NamedVectors::default().add_vector(self.vector_name.clone(), vector);
            points.push(PointStruct::new(
                Uuid::new_v4().to_string(),
                vectors,
                payload,
            ));
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| SpecRagError::Store(format!("failed to upsert chunks: {e}")))?;

        Ok(chunks.len())
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let vector = self.embed_query(query).await?;

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector, k as u64)
                    .vector_name(self.vector_name.clone())
                    .with_payload(true),
            )
            .await
            .map_err(|e| SpecRagError::Retrieval(format!("vector search failed: {e}")))?;

        Ok(results
            .result
            .into_iter()
            .filter_map(chunk_from_point)
            .collect())
    }

    async fn delete_all(&self) -> Result<u64> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(Filter::default())
                    .wait(true),
            )
            .await
            .map_err(|e| SpecRagError::Store(format!("failed to delete records: {e}")))?;

        // Qdrant's delete response carries no removed count.
        Ok(0)
    }
}

/// Rebuild a scored chunk from a search hit's payload.
///
/// A hit without a string `text` field cannot become a chunk; it is
/// skipped with a warning rather than failing the whole search.
fn chunk_from_point(point: ScoredPoint) -> Option<ScoredChunk> {
    let text = match point.payload.get("text").and_then(|v| v.kind.clone()) {
        Some(Kind::StringValue(s)) => s,
        _ => {
            tracing::warn!(id = ?point.id, "search hit without text payload, skipping");
            return None;
        }
    };

    let mut metadata = HashMap::new();
    if let Some(Kind::StructValue(fields)) = point
        .payload
        .get("metadata")
        .and_then(|v| v.kind.clone())
    {
        for (key, value) in fields.fields {
            if let Some(Kind::StringValue(s)) = value.kind {
                metadata.insert(key, s);
            }
        }
    }

    Some(ScoredChunk {
        chunk: Chunk::new(text, metadata),
        score: point.score,
    })
}

fn parse_distance(similarity: &str) -> Result<Distance> {
    match similarity.to_lowercase().as_str() {
        "dotproduct" | "dot" => Ok(Distance::Dot),
        "cosine" => Ok(Distance::Cosine),
        "euclidean" | "euclid" => Ok(Distance::Euclid),
        other => Err(SpecRagError::Config(format!(
            "unsupported similarity metric: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::{Struct, Value};

    #[test]
    fn test_parse_distance() {
        assert_eq!(parse_distance("dotProduct").unwrap(), Distance::Dot);
        assert_eq!(parse_distance("cosine").unwrap(), Distance::Cosine);
        assert_eq!(parse_distance("euclidean").unwrap(), Distance::Euclid);
        assert!(parse_distance("hamming").is_err());
    }

    fn string_value(s: &str) -> Value {
        Value {
            kind: Some(Kind::StringValue(s.to_string())),
        }
    }

    #[test]
    fn test_chunk_from_point_rebuilds_metadata() {
        let mut meta_fields = HashMap::new();
        meta_fields.insert("source".to_string(), string_value("auth.md"));

        let mut payload = HashMap::new();
        payload.insert("text".to_string(), string_value("Clients MUST authenticate."));
        payload.insert(
            "metadata".to_string(),
            Value {
                kind: Some(Kind::StructValue(Struct {
                    fields: meta_fields,
                })),
            },
        );

        let point = ScoredPoint {
            payload,
            score: 0.9,
            ..ScoredPoint::default()
        };

        let scored = chunk_from_point(point).unwrap();
        assert_eq!(scored.chunk.text, "Clients MUST authenticate.");
        assert_eq!(scored.chunk.source(), Some("auth.md"));
        assert_eq!(scored.score, 0.9);
    }

    #[test]
    fn test_point_without_text_payload_is_skipped() {
        let point = ScoredPoint {
            payload: HashMap::new(),
            score: 0.5,
            ..ScoredPoint::default()
        };

        assert!(chunk_from_point(point).is_none());
    }

    struct FixedDimension(usize);

    #[async_trait]
    impl EmbeddingClient for FixedDimension {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0; self.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0; self.0]).collect())
        }

        fn dimension(&self) -> usize {
            self.0
        }
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected_at_construction() {
        let config = VectorConfig::default();

        let err = QdrantStore::new(&config, Arc::new(FixedDimension(768))).unwrap_err();
        assert!(matches!(err, SpecRagError::Config(_)));

        assert!(QdrantStore::new(&config, Arc::new(FixedDimension(1536))).is_ok());
    }
}

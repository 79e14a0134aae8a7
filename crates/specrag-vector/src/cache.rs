//! Embedding cache for repeated query texts
//!
//! The ask pipeline embeds the same query text once per retrieval; repeated
//! questions (and the sub-questions of a re-run chain) hit the same
//! embeddings. Backed by moka for thread-safe, async-compatible LRU caching
//! with TTL support.

use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_MAX_CAPACITY: u64 = 10_000;
// Embeddings are stable for a given model, cache for an hour.
const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Cache for text embeddings
#[derive(Clone)]
pub struct EmbeddingCache {
    cache: Cache<u64, Vec<f32>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl EmbeddingCache {
    /// Create a cache with default capacity and TTL
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY, Duration::from_secs(DEFAULT_TTL_SECONDS))
    }

    /// Create a cache with explicit capacity and TTL
    pub fn with_capacity(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get a cached embedding for `text`
    pub async fn get(&self, text: &str) -> Option<Vec<f32>> {
        let result = self.cache.get(&hash_text(text)).await;
        if result.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Store an embedding for `text`
    pub async fn put(&self, text: &str, embedding: Vec<f32>) {
        self.cache.insert(hash_text(text), embedding).await;
    }

    /// Invalidate every cached embedding
    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Current hit/miss counters
    pub fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsReport {
    pub hits: u64,
    pub misses: u64,
}

fn hash_text(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = EmbeddingCache::new();
        cache.put("what is auth?", vec![0.1, 0.2]).await;

        assert_eq!(cache.get("what is auth?").await, Some(vec![0.1, 0.2]));
        assert_eq!(cache.get("different query").await, None);
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let cache = EmbeddingCache::new();
        cache.put("q", vec![1.0]).await;

        cache.get("q").await;
        cache.get("q").await;
        cache.get("missing").await;

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = EmbeddingCache::new();
        cache.put("q", vec![1.0]).await;
        cache.clear().await;
        assert_eq!(cache.get("q").await, None);
    }
}

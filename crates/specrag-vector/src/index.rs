//! Vector index lifecycle management
//!
//! Guarantees the storage collection and its named vector index exist and
//! are queryable before any embedding write or similarity search. Creation
//! is idempotent: an index that already exists and is queryable is never
//! re-created. Readiness is awaited by polling on a fixed interval, bounded
//! by a caller-supplied deadline rather than an iteration cap.

use specrag_core::{IndexDescriptor, IndexSpec, Result, SpecRagError};
use std::time::Duration;
use tokio::time::{sleep, Instant};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Store-level index operations the manager drives
#[async_trait::async_trait]
pub trait SearchIndexOps: Send + Sync {
    /// Create the backing collection if absent; tolerates already-exists
    async fn ensure_collection(&self) -> Result<()>;

    /// List existing indexes matching `name`
    async fn list_indexes(&self, name: &str) -> Result<Vec<IndexDescriptor>>;

    /// Issue a create request for the index, returning its name
    async fn create_index(&self, spec: &IndexSpec) -> Result<String>;
}

#[async_trait::async_trait]
impl<S: SearchIndexOps + ?Sized> SearchIndexOps for std::sync::Arc<S> {
    async fn ensure_collection(&self) -> Result<()> {
        (**self).ensure_collection().await
    }

    async fn list_indexes(&self, name: &str) -> Result<Vec<IndexDescriptor>> {
        (**self).list_indexes(name).await
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<String> {
        (**self).create_index(spec).await
    }
}

/// Drives a collection and its named vector index to the queryable state
pub struct IndexManager<S> {
    ops: S,
    poll_interval: Duration,
}

impl<S: SearchIndexOps> IndexManager<S> {
    /// Create a manager with the default 5s poll interval
    pub fn new(ops: S) -> Self {
        Self {
            ops,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Ensure the collection exists and the index is queryable.
    ///
    /// Returns immediately when a queryable index with the spec's name
    /// already exists. Otherwise issues one create request and polls until
    /// the index reports queryable or `deadline` expires, which surfaces
    /// `SpecRagError::IndexProvisioning`.
    pub async fn ensure_ready(&self, spec: &IndexSpec, deadline: Duration) -> Result<()> {
        self.ops.ensure_collection().await?;

        if self.queryable(&spec.name).await? {
            tracing::info!(index = %spec.name, "search index already exists");
            return Ok(());
        }

        tracing::info!(index = %spec.name, "search index does not exist, creating it");
        let name = self.ops.create_index(spec).await?;

        let started = Instant::now();
        loop {
            if self.queryable(&name).await? {
                tracing::info!(index = %name, "search index queryable");
                return Ok(());
            }

            if started.elapsed() >= deadline {
                return Err(SpecRagError::IndexProvisioning(format!(
                    "index {name} not queryable within {deadline:?}"
                )));
            }

            sleep(self.poll_interval).await;
        }
    }

    async fn queryable(&self, name: &str) -> Result<bool> {
        let indexes = self.ops.list_indexes(name).await?;
        Ok(indexes.iter().any(|idx| idx.name == name && idx.queryable))
    }
}

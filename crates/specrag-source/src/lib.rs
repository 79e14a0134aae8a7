//! specrag Source - Document fetching from a remote repository
//!
//! Recursively lists a GitHub repository through the contents API and
//! downloads every markdown file under the configured content root,
//! skipping paths carrying the test-exclusion marker. A single failed
//! listing or download aborts the whole fetch: sync never accepts a
//! partial corpus.

use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use specrag_core::{Document, Result, SourceConfig, SpecRagError};

/// Trait for the document-source collaborator
#[async_trait::async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch the full document set, sorted by path
    async fn fetch_all(&self) -> Result<Vec<Document>>;
}

/// A directory entry as returned by the GitHub contents API
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(rename = "download_url")]
    pub download_url: Option<String>,
}

/// GitHub-backed document source
pub struct GitHubSource {
    client: reqwest::Client,
    config: SourceConfig,
}

impl GitHubSource {
    /// Create a new source for the configured repository
    pub fn new(config: SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("specrag")
            .build()
            .map_err(|e| SpecRagError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Whether a listed entry belongs in the corpus
    fn retained(&self, entry: &GitHubEntry) -> bool {
        entry.entry_type == "file"
            && entry.name.ends_with(&self.config.extension)
            && entry.path.contains(&self.config.content_root)
            && !entry.path.contains(&self.config.exclude_marker)
    }

    async fn list_dir(&self, dir: &str) -> Result<Vec<GitHubEntry>> {
        let url = format!(
            "{}/{}/{}/contents/{}",
            self.config.api_base, self.config.owner, self.config.repo, dir
        );

        let mut request = self.client.get(&url);
        if let Some(token) = &self.config.token {
            request = request.header("Authorization", format!("token {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| SpecRagError::Fetch(format!("failed to list {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(SpecRagError::Fetch(format!(
                "failed to list {url}: status {}",
                response.status()
            )));
        }

        response
            .json::<Vec<GitHubEntry>>()
            .await
            .map_err(|e| SpecRagError::Fetch(format!("failed to parse listing of {url}: {e}")))
    }

    async fn download(&self, path: &str, url: &str) -> Result<Document> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SpecRagError::Fetch(format!("failed to fetch {path}: {e}")))?;

        if !response.status().is_success() {
            return Err(SpecRagError::Fetch(format!(
                "failed to fetch {path}: status {}",
                response.status()
            )));
        }

        let content = response
            .text()
            .await
            .map_err(|e| SpecRagError::Fetch(format!("failed to read {path}: {e}")))?;

        tracing::info!(path, "fetched file");
        Ok(Document::new(path, content))
    }

    /// Recursively collect documents under `dir`.
    ///
    /// Files and subdirectories of one listing are fetched concurrently;
    /// the external tree is read-only during sync, so the fan-out is safe.
    fn fetch_dir<'a>(&'a self, dir: &'a str) -> BoxFuture<'a, Result<Vec<Document>>> {
        async move {
            let entries = self.list_dir(dir).await?;

            let mut file_futures = Vec::new();
            let mut dir_futures = Vec::new();

            for entry in &entries {
                if self.retained(entry) {
                    let url = entry.download_url.as_ref().ok_or_else(|| {
                        SpecRagError::Fetch(format!("file {} has no download URL", entry.path))
                    })?;
                    file_futures.push(self.download(&entry.path, url));
                } else if entry.entry_type == "dir" {
                    dir_futures.push(self.fetch_dir(&entry.path));
                }
            }

            let mut documents = futures::future::try_join_all(file_futures).await?;
            for sub in futures::future::try_join_all(dir_futures).await? {
                documents.extend(sub);
            }

            Ok(documents)
        }
        .boxed()
    }
}

#[async_trait::async_trait]
impl DocumentSource for GitHubSource {
    async fn fetch_all(&self) -> Result<Vec<Document>> {
        tracing::info!(
            owner = %self.config.owner,
            repo = %self.config.repo,
            "fetching markdown files"
        );

        let mut documents = self.fetch_dir("").await?;
        // Sorted so downstream chunk output is deterministic per corpus.
        documents.sort_by(|a, b| a.path.cmp(&b.path));

        tracing::info!(count = documents.len(), "fetched corpus");
        Ok(documents)
    }
}

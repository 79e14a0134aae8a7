//! Corpus synchronization
//!
//! Fetches every document from the source, chunks them, and full-replaces
//! the vector store contents: delete everything, then insert the fresh
//! chunks. Fetch or chunking failures abort before any deletion so a
//! failed run leaves the previous index intact.

use std::collections::HashMap;

use specrag_chunker::Chunker;
use specrag_core::{Chunk, Document, Result, META_SOURCE, VectorStore};
use specrag_source::DocumentSource;

/// Fetch the corpus, chunk it, and replace the store contents with the
/// fresh chunks.
pub async fn sync(
    source: &dyn DocumentSource,
    chunker: &dyn Chunker,
    store: &dyn VectorStore,
) -> Result<()> {
    let documents = source.fetch_all().await?;
    tracing::info!(documents = documents.len(), "fetched corpus");

    let chunks = chunk_documents(chunker, &documents)?;
    tracing::info!(chunks = chunks.len(), "chunked corpus");

    let deleted = store.delete_all().await?;
    tracing::info!(deleted, "cleared previous index contents");

    let inserted = store.add_chunks(&chunks).await?;
    tracing::info!(inserted, "inserted fresh chunks");

    Ok(())
}

/// Chunk a batch of documents, tagging each chunk with the file name of
/// the document it came from.
fn chunk_documents(chunker: &dyn Chunker, documents: &[Document]) -> Result<Vec<Chunk>> {
    let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
    let metadata: Vec<HashMap<String, String>> = documents
        .iter()
        .map(|d| {
            let mut meta = HashMap::new();
            meta.insert(META_SOURCE.to_string(), d.file_name().to_string());
            meta
        })
        .collect();

    chunker.chunk(&texts, &metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use specrag_chunker::SentenceChunker;
    use specrag_core::{ScoredChunk, SpecRagError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockSource {
        documents: Vec<Document>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl DocumentSource for MockSource {
        async fn fetch_all(&self) -> specrag_core::Result<Vec<Document>> {
            if self.fail {
                return Err(SpecRagError::Fetch("remote unavailable".to_string()));
            }
            Ok(self.documents.clone())
        }
    }

    struct FailingChunker;

    impl Chunker for FailingChunker {
        fn chunk(
            &self,
            _texts: &[String],
            _metadata: &[HashMap<String, String>],
        ) -> specrag_core::Result<Vec<Chunk>> {
            Err(SpecRagError::Chunking("bad input".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        existing: usize,
        delete_calls: AtomicUsize,
        added: Mutex<Vec<Chunk>>,
        ops: Mutex<Vec<&'static str>>,
    }

    #[async_trait::async_trait]
    impl VectorStore for RecordingStore {
        async fn add_chunks(&self, chunks: &[Chunk]) -> specrag_core::Result<usize> {
            self.ops.lock().unwrap().push("add");
            self.added.lock().unwrap().extend_from_slice(chunks);
            Ok(chunks.len())
        }

        async fn similarity_search(
            &self,
            _query: &str,
            _k: usize,
        ) -> specrag_core::Result<Vec<ScoredChunk>> {
            Ok(Vec::new())
        }

        async fn delete_all(&self) -> specrag_core::Result<u64> {
            self.ops.lock().unwrap().push("delete");
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.existing as u64)
        }
    }

    fn doc(path: &str, content: &str) -> Document {
        Document {
            path: path.to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_sync_full_replace() {
        let source = MockSource {
            documents: vec![
                doc(
                    "source/auth/auth.md",
                    "one two three. four five six. seven eight nine.",
                ),
                doc(
                    "source/crud/crud.md",
                    "ten eleven twelve. thirteen fourteen fifteen. sixteen seventeen eighteen.",
                ),
            ],
            fail: false,
        };
        let chunker = SentenceChunker::new(3, 0).unwrap();
        let store = RecordingStore {
            existing: 10,
            ..RecordingStore::default()
        };

        sync(&source, &chunker, &store).await.unwrap();

        let added = store.added.lock().unwrap();
        assert_eq!(added.len(), 6);
        assert_eq!(store.delete_calls.load(Ordering::SeqCst), 1);

        // Chunks carry the file name, not the full repo path.
        assert_eq!(added[0].source(), Some("auth.md"));
        assert_eq!(added[3].source(), Some("crud.md"));
    }

    #[tokio::test]
    async fn test_delete_precedes_add() {
        let source = MockSource {
            documents: vec![doc("source/a/a.md", "hello world.")],
            fail: false,
        };
        let chunker = SentenceChunker::new(16, 0).unwrap();
        let store = RecordingStore::default();

        sync(&source, &chunker, &store).await.unwrap();

        let ops = store.ops.lock().unwrap();
        assert_eq!(ops.as_slice(), ["delete", "add"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_store_untouched() {
        let source = MockSource {
            documents: Vec::new(),
            fail: true,
        };
        let chunker = SentenceChunker::new(16, 0).unwrap();
        let store = RecordingStore::default();

        let err = sync(&source, &chunker, &store).await.unwrap_err();

        assert!(matches!(err, SpecRagError::Fetch(_)));
        assert_eq!(store.delete_calls.load(Ordering::SeqCst), 0);
        assert!(store.added.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chunking_failure_leaves_store_untouched() {
        let source = MockSource {
            documents: vec![doc("source/a/a.md", "text.")],
            fail: false,
        };
        let store = RecordingStore::default();

        let err = sync(&source, &FailingChunker, &store).await.unwrap_err();

        assert!(matches!(err, SpecRagError::Chunking(_)));
        assert_eq!(store.delete_calls.load(Ordering::SeqCst), 0);
    }
}

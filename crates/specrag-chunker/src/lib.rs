//! specrag Chunker - Splitting documents into retrieval-sized units
//!
//! Two interchangeable strategies behind the `Chunker` trait:
//! - `MarkdownChunker`: heading-aware structural splitting with a chunk
//!   budget measured in embedding-model tokens
//! - `SentenceChunker`: sentence grouping with a word-count budget and
//!   word-level overlap between consecutive groups
//!
//! Both variants are deterministic: identical input text and metadata
//! always produce identical, identically-ordered output.

pub mod markdown;
pub mod sentence;

pub use markdown::MarkdownChunker;
pub use sentence::SentenceChunker;

use specrag_core::{Chunk, Result, SpecRagError};
use std::collections::HashMap;

/// Pluggable chunking capability.
///
/// `texts` and `metadata` must have the same length; each produced chunk
/// inherits the metadata of the text it was derived from.
pub trait Chunker: Send + Sync {
    fn chunk(
        &self,
        texts: &[String],
        metadata: &[HashMap<String, String>],
    ) -> Result<Vec<Chunk>>;
}

pub(crate) fn check_input_lengths(
    texts: &[String],
    metadata: &[HashMap<String, String>],
) -> Result<()> {
    if texts.len() != metadata.len() {
        return Err(SpecRagError::Chunking(format!(
            "mismatched input lengths: {} texts, {} metadata entries",
            texts.len(),
            metadata.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatched_lengths_rejected() {
        let texts = vec!["one".to_string(), "two".to_string()];
        let metadata = vec![HashMap::new()];

        let err = check_input_lengths(&texts, &metadata).unwrap_err();
        assert!(matches!(err, SpecRagError::Chunking(_)));
        assert!(err.to_string().contains("2 texts"));
    }
}

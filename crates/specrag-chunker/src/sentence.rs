//! Sentence-group chunker with a word-count budget
//!
//! Sentences are detected on `.` `!` `?` boundaries with a simple regex
//! class; the splitter is not abbreviation-aware, so "e.g." produces two
//! sentences. Known limitation, acceptable for specification prose.
//!
//! Consecutive sentences are grouped greedily until adding the next one
//! would exceed the word budget. The trailing overlap words of a closed
//! group are duplicated into the next group to preserve cross-boundary
//! context. A single sentence larger than the budget forms a group of its
//! own.

use crate::{check_input_lengths, Chunker};
use regex::Regex;
use specrag_core::{Chunk, Result, SpecRagError, META_CHUNK_INDEX};
use std::collections::HashMap;

/// Sentence-group chunker
pub struct SentenceChunker {
    boundary: Regex,
    max_words: usize,
    overlap_words: usize,
}

impl SentenceChunker {
    /// Create a chunker with the given word budget and overlap.
    ///
    /// `overlap_words` must be smaller than `max_words` or the seed alone
    /// would fill every group.
    pub fn new(max_words: usize, overlap_words: usize) -> Result<Self> {
        if max_words == 0 {
            return Err(SpecRagError::Chunking(
                "max_words must be positive".to_string(),
            ));
        }
        if overlap_words >= max_words {
            return Err(SpecRagError::Chunking(format!(
                "overlap_words ({overlap_words}) must be smaller than max_words ({max_words})"
            )));
        }

        let boundary = Regex::new(r"[^.!?]+[.!?]*")
            .map_err(|e| SpecRagError::Chunking(format!("invalid boundary pattern: {e}")))?;

        Ok(Self {
            boundary,
            max_words,
            overlap_words,
        })
    }

    fn split_sentences(&self, text: &str) -> Vec<String> {
        self.boundary
            .find_iter(text)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Trailing `overlap_words` words of a closed group
    fn overlap_seed(&self, group: &str) -> Vec<String> {
        if self.overlap_words == 0 {
            return Vec::new();
        }
        let words: Vec<&str> = group.split_whitespace().collect();
        let start = words.len().saturating_sub(self.overlap_words);
        words[start..].iter().map(|w| w.to_string()).collect()
    }

    fn chunk_one(
        &self,
        text: &str,
        base: &HashMap<String, String>,
        chunks: &mut Vec<Chunk>,
    ) {
        let mut index: u32 = 0;
        // Seed words carried from the previous close are tracked apart from
        // the group's own sentences: they count against the budget but a
        // group holding only seed words is never emitted.
        let mut seed: Vec<String> = Vec::new();
        let mut group: Vec<String> = Vec::new();
        let mut group_words = 0usize;

        let mut push = |text: String, index: &mut u32, chunks: &mut Vec<Chunk>| {
            let mut metadata = base.clone();
            metadata.insert(META_CHUNK_INDEX.to_string(), index.to_string());
            chunks.push(Chunk::new(text, metadata));
            *index += 1;
        };

        let render = |seed: &[String], group: &[String]| -> String {
            let mut parts: Vec<&str> = seed.iter().map(String::as_str).collect();
            parts.extend(group.iter().map(String::as_str));
            parts.join(" ")
        };

        for sentence in self.split_sentences(text) {
            let words = sentence.split_whitespace().count();

            // An oversized sentence becomes its own group, without any
            // seed prefix so the budget exception stays a single unit.
            if words > self.max_words {
                if !group.is_empty() {
                    push(render(&seed, &group), &mut index, chunks);
                }
                seed = self.overlap_seed(&sentence);
                push(sentence, &mut index, chunks);
                group.clear();
                group_words = 0;
                continue;
            }

            if !group.is_empty() && seed.len() + group_words + words > self.max_words {
                let closed = render(&seed, &group);
                seed = self.overlap_seed(&closed);
                push(closed, &mut index, chunks);
                group.clear();
                group_words = 0;
            }

            // Seed words count against the budget too; trim from the front
            // rather than let the seed push the new group past the max.
            if group.is_empty() && seed.len() + words > self.max_words {
                let keep = self.max_words - words;
                seed.drain(..seed.len() - keep);
            }

            group.push(sentence);
            group_words += words;
        }

        if !group.is_empty() {
            push(render(&seed, &group), &mut index, chunks);
        }
    }
}

impl Chunker for SentenceChunker {
    fn chunk(
        &self,
        texts: &[String],
        metadata: &[HashMap<String, String>],
    ) -> Result<Vec<Chunk>> {
        check_input_lengths(texts, metadata)?;

        let mut chunks = Vec::new();
        for (text, base) in texts.iter().zip(metadata.iter()) {
            self.chunk_one(text, base, &mut chunks);
        }

        Ok(chunks)
    }
}

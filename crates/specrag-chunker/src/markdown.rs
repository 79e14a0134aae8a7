//! Heading-aware structural chunker for markdown documents
//!
//! Splits on ATX heading boundaries and paragraph breaks, packing blocks
//! into chunks capped at a token budget. Sizing uses the embedding model's
//! own tokenizer so the retrieval field fits the model's input budget
//! without truncation at embed time. Consecutive chunks of the same section
//! share a trailing-token overlap to preserve cross-boundary context.

use crate::{check_input_lengths, Chunker};
use specrag_core::{Chunk, Result, SpecRagError, META_HEADING};
use std::collections::HashMap;
use tiktoken_rs::CoreBPE;

/// Markdown-aware chunker with a model-token budget
pub struct MarkdownChunker {
    bpe: CoreBPE,
    chunk_size: usize,
    chunk_overlap: usize,
}

/// A paragraph-level block with the heading path in effect where it appears
#[derive(Debug, Clone, PartialEq)]
struct Block {
    heading_path: Vec<String>,
    text: String,
}

impl MarkdownChunker {
    /// Create a chunker sized with the tokenizer of `model_name`.
    ///
    /// Falls back to the `cl100k_base` encoding for models tiktoken does
    /// not know by name.
    pub fn new(model_name: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(model_name)
            .or_else(|_| tiktoken_rs::cl100k_base())
            .map_err(|e| SpecRagError::Chunking(format!("failed to load tokenizer: {e}")))?;

        Ok(Self {
            bpe,
            chunk_size,
            chunk_overlap,
        })
    }

    fn token_count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Split a document into paragraph blocks, tracking the heading stack.
    ///
    /// Heading lines become blocks of their own section so concatenating
    /// chunk texts recovers the document content.
    fn split_blocks(&self, text: &str) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut stack: Vec<(usize, String)> = Vec::new();
        let mut paragraph = String::new();

        let mut flush = |paragraph: &mut String, stack: &[(usize, String)], out: &mut Vec<Block>| {
            let trimmed = paragraph.trim();
            if !trimmed.is_empty() {
                out.push(Block {
                    heading_path: stack.iter().map(|(_, h)| h.clone()).collect(),
                    text: trimmed.to_string(),
                });
            }
            paragraph.clear();
        };

        for line in text.lines() {
            if let Some((level, title)) = parse_heading(line) {
                flush(&mut paragraph, &stack, &mut blocks);
                while stack.last().is_some_and(|(l, _)| *l >= level) {
                    stack.pop();
                }
                stack.push((level, title.to_string()));
                blocks.push(Block {
                    heading_path: stack.iter().map(|(_, h)| h.clone()).collect(),
                    text: line.trim().to_string(),
                });
            } else if line.trim().is_empty() {
                flush(&mut paragraph, &stack, &mut blocks);
            } else {
                if !paragraph.is_empty() {
                    paragraph.push('\n');
                }
                paragraph.push_str(line);
            }
        }
        flush(&mut paragraph, &stack, &mut blocks);

        blocks
    }

    /// Split an oversized block on sentence boundaries, then on words for
    /// sentences that still exceed the budget on their own.
    fn split_oversized(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();

        for sentence in split_sentences(text) {
            if self.token_count(&sentence) <= self.chunk_size {
                pieces.push(sentence);
                continue;
            }

            let words: Vec<&str> = sentence.split_whitespace().collect();
            let mut piece = String::new();
            for word in words {
                let candidate = if piece.is_empty() {
                    word.to_string()
                } else {
                    format!("{piece} {word}")
                };
                if !piece.is_empty() && self.token_count(&candidate) > self.chunk_size {
                    pieces.push(piece);
                    piece = word.to_string();
                } else {
                    piece = candidate;
                }
            }
            if !piece.is_empty() {
                pieces.push(piece);
            }
        }

        pieces
    }

    /// Trailing words of `text` amounting to roughly the overlap budget
    fn overlap_tail(&self, text: &str) -> String {
        if self.chunk_overlap == 0 {
            return String::new();
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        let mut tail: Vec<&str> = Vec::new();
        for word in words.iter().rev().copied() {
            tail.push(word);
            let candidate: String = tail.iter().rev().copied().collect::<Vec<_>>().join(" ");
            if self.token_count(&candidate) >= self.chunk_overlap {
                break;
            }
        }
        tail.reverse();
        tail.join(" ")
    }

    /// Start the next chunk with the closed chunk's overlap tail plus the
    /// incoming block, shrinking the tail word by word when the combination
    /// would itself exceed the token budget.
    fn seed_with_overlap(&self, closed: &str, block: &str) -> String {
        let mut tail = self.overlap_tail(closed);
        loop {
            let seeded = if tail.is_empty() {
                block.to_string()
            } else {
                format!("{tail}\n\n{block}")
            };
            if tail.is_empty() || self.token_count(&seeded) <= self.chunk_size {
                return seeded;
            }
            tail = match tail.split_once(' ') {
                Some((_, rest)) => rest.to_string(),
                None => String::new(),
            };
        }
    }

    /// Pack one section's blocks into budget-sized chunks
    fn pack_section(
        &self,
        heading_path: &[String],
        section: &[String],
        base: &HashMap<String, String>,
        out: &mut Vec<Chunk>,
    ) {
        let mut metadata = base.clone();
        if !heading_path.is_empty() {
            metadata.insert(META_HEADING.to_string(), heading_path.join(" > "));
        }

        let mut current = String::new();

        for text in section {
            let candidate = if current.is_empty() {
                text.clone()
            } else {
                format!("{current}\n\n{text}")
            };

            if !current.is_empty() && self.token_count(&candidate) > self.chunk_size {
                out.push(Chunk::new(current.clone(), metadata.clone()));
                current = self.seed_with_overlap(&current, text);
            } else {
                current = candidate;
            }
        }

        if !current.trim().is_empty() {
            out.push(Chunk::new(current, metadata));
        }
    }
}

impl Chunker for MarkdownChunker {
    fn chunk(
        &self,
        texts: &[String],
        metadata: &[HashMap<String, String>],
    ) -> Result<Vec<Chunk>> {
        check_input_lengths(texts, metadata)?;

        let mut chunks = Vec::new();

        for (text, base) in texts.iter().zip(metadata.iter()) {
            let blocks = self.split_blocks(text);

            // Group consecutive blocks sharing a heading path so chunks
            // never span a heading boundary.
            let mut section: Vec<String> = Vec::new();
            let mut section_path: Vec<String> = Vec::new();

            for block in &blocks {
                if block.heading_path != section_path && !section.is_empty() {
                    self.pack_section(&section_path, &section, base, &mut chunks);
                    section.clear();
                }
                section_path = block.heading_path.clone();

                if self.token_count(&block.text) > self.chunk_size {
                    section.extend(self.split_oversized(&block.text));
                } else {
                    section.push(block.text.clone());
                }
            }
            if !section.is_empty() {
                self.pack_section(&section_path, &section, base, &mut chunks);
            }
        }

        Ok(chunks)
    }
}

/// Parse an ATX heading line into (level, title)
fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.starts_with(' ') && !rest.is_empty() {
        return None;
    }
    Some((level, rest.trim()))
}

/// Naive sentence split on `.` `!` `?` terminators
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = end;
        }
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

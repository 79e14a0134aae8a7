//! Prompt composition
//!
//! Pure, deterministic rendering of retrieved chunks plus the question
//! (and the chained prior answer, when present) into a model-ready prompt.
//! The composer never calls the network and never mutates its inputs.

use specrag_core::ScoredChunk;

/// A prompt composition function: question, retrieved chunks, and the
/// optional answer chained from the previous sub-question.
pub type PromptFn = fn(&str, &[ScoredChunk], Option<&str>) -> String;

/// Default prompt: expert preamble, grounding instruction, indexed chunks
/// with their source and heading metadata, chained context, then the
/// literal question.
pub fn default_prompt(question: &str, chunks: &[ScoredChunk], chained: Option<&str>) -> String {
    let mut builder = PromptBuilder::new()
        .system("You are an expert on MongoDB specifications.")
        .instruction(
            "Use the following context to answer the question accurately. \
             Keep your answer grounded in this context. If you're unsure, say 'I don't know.'",
        );

    for result in chunks {
        builder = builder.add_chunk(result);
    }

    if let Some(previous) = chained {
        builder = builder.chained_context(previous);
    }

    builder.question(question).build()
}

/// Builder for RAG prompts
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    system: String,
    instruction: String,
    contexts: Vec<String>,
    chained: Option<String>,
    question: String,
}

impl PromptBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the system preamble
    pub fn system(mut self, preamble: impl Into<String>) -> Self {
        self.system = preamble.into();
        self
    }

    /// Set the grounding instruction
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Append a retrieved chunk as a context section
    pub fn add_chunk(mut self, result: &ScoredChunk) -> Self {
        let index = self.contexts.len() + 1;
        let source = result.chunk.source().unwrap_or("unknown");
        let heading = result.chunk.heading().unwrap_or("");
        self.contexts.push(format!(
            "[Chunk {index}: {source} / {heading}]\n{}\n---\n",
            result.chunk.text
        ));
        self
    }

    /// Set the answer chained from the previous sub-question
    pub fn chained_context(mut self, previous: impl Into<String>) -> Self {
        self.chained = Some(previous.into());
        self
    }

    /// Set the question
    pub fn question(mut self, question: impl Into<String>) -> Self {
        self.question = question.into();
        self
    }

    /// Render the prompt
    pub fn build(self) -> String {
        let mut prompt = String::new();

        if !self.system.is_empty() {
            prompt.push_str(&self.system);
            prompt.push_str("\n\n");
        }

        if !self.instruction.is_empty() {
            prompt.push_str(&self.instruction);
            prompt.push_str("\n\n");
        }

        prompt.push_str("Context:\n");
        for context in &self.contexts {
            prompt.push_str(context);
        }

        if let Some(chained) = &self.chained {
            prompt.push_str(chained);
        }

        prompt.push_str(&format!("\nQuestion: {}\n", self.question));
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specrag_core::{Chunk, META_HEADING, META_SOURCE};
    use std::collections::HashMap;

    fn scored(text: &str, source: &str, heading: Option<&str>, score: f32) -> ScoredChunk {
        let mut metadata = HashMap::new();
        metadata.insert(META_SOURCE.to_string(), source.to_string());
        if let Some(h) = heading {
            metadata.insert(META_HEADING.to_string(), h.to_string());
        }
        ScoredChunk {
            chunk: Chunk::new(text, metadata),
            score,
        }
    }

    #[test]
    fn test_default_prompt_renders_indexed_chunks() {
        let chunks = vec![
            scored("SCRAM is required.", "auth.md", Some("Auth > SCRAM"), 0.9),
            scored("Retries are bounded.", "retry.md", None, 0.7),
        ];

        let prompt = default_prompt("What is SCRAM?", &chunks, None);

        assert!(prompt.starts_with("You are an expert on MongoDB specifications."));
        assert!(prompt.contains("say 'I don't know.'"));
        assert!(prompt.contains("[Chunk 1: auth.md / Auth > SCRAM]\nSCRAM is required."));
        assert!(prompt.contains("[Chunk 2: retry.md / ]\nRetries are bounded."));
        assert!(prompt.ends_with("\nQuestion: What is SCRAM?\n"));
    }

    #[test]
    fn test_chunks_render_in_given_order() {
        let chunks = vec![
            scored("first", "a.md", None, 0.9),
            scored("second", "b.md", None, 0.8),
        ];

        let prompt = default_prompt("q", &chunks, None);
        let first = prompt.find("[Chunk 1: a.md").unwrap();
        let second = prompt.find("[Chunk 2: b.md").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_chained_context_appended_before_question() {
        let chunks = vec![scored("ctx", "a.md", None, 0.5)];
        let prompt = default_prompt("And then?", &chunks, Some("Previous answer."));

        let chained = prompt.find("Previous answer.").unwrap();
        let question = prompt.find("Question: And then?").unwrap();
        assert!(chained < question);
    }

    #[test]
    fn test_deterministic() {
        let chunks = vec![scored("ctx", "a.md", Some("H"), 0.5)];
        let a = default_prompt("q", &chunks, Some("prev"));
        let b = default_prompt("q", &chunks, Some("prev"));
        assert_eq!(a, b);
    }
}

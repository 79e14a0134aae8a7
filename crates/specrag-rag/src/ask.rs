//! Multi-hop answer pipeline
//!
//! Splits a compound question on the literal `|` separator and processes
//! each sub-question in order: retrieve, compose a prompt, generate. The
//! previous sub-answer is chained into the next prompt as extra context,
//! and only the final sub-answer is returned. Any retrieval or generation
//! failure aborts the whole chain.

use crate::prompt::{default_prompt, PromptFn};
use specrag_core::{LlmClient, Result, VectorStore};

/// Default number of chunks retrieved per sub-question
pub const DEFAULT_NUM_DOCS: usize = 4;

/// Options for the ask pipeline
#[derive(Clone)]
pub struct AskOptions {
    /// Number of chunks retrieved per sub-question
    pub num_docs: usize,

    /// Fixed sampling temperature for every generation call
    pub temperature: f32,

    /// Prompt composition function
    pub prompt_fn: PromptFn,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            num_docs: DEFAULT_NUM_DOCS,
            temperature: 1.0,
            prompt_fn: default_prompt,
        }
    }
}

/// Answer a question (optionally pipe-delimited into chained sub-questions)
/// by retrieving relevant chunks and prompting the LLM per sub-question.
pub async fn ask(
    store: &dyn VectorStore,
    llm: &dyn LlmClient,
    question: &str,
    options: &AskOptions,
) -> Result<String> {
    let mut response = String::new();

    for query in question.split('|') {
        let results = store.similarity_search(query, options.num_docs).await?;
        tracing::debug!(query, results = results.len(), "similarity search done");

        let prompt = if response.is_empty() {
            (options.prompt_fn)(query, &results, None)
        } else {
            (options.prompt_fn)(query, &results, Some(&response))
        };

        tracing::info!(prompt_len = prompt.len(), "calling generation service");
        tracing::debug!(%prompt, "full prompt");

        response = llm.generate(&prompt, options.temperature).await?;
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use specrag_core::{Chunk, ScoredChunk, SpecRagError, META_SOURCE};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockStore {
        search_calls: AtomicUsize,
        queries: Mutex<Vec<String>>,
        results: Vec<ScoredChunk>,
        fail: bool,
    }

    impl MockStore {
        fn with_results(results: Vec<ScoredChunk>) -> Self {
            Self {
                search_calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
                results,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                search_calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
                results: Vec::new(),
                fail: true,
            }
        }
    }

    #[async_trait::async_trait]
    impl VectorStore for MockStore {
        async fn add_chunks(&self, chunks: &[Chunk]) -> specrag_core::Result<usize> {
            Ok(chunks.len())
        }

        async fn similarity_search(
            &self,
            query: &str,
            k: usize,
        ) -> specrag_core::Result<Vec<ScoredChunk>> {
            if self.fail {
                return Err(SpecRagError::Retrieval("search unavailable".to_string()));
            }
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.results.iter().take(k).cloned().collect())
        }

        async fn delete_all(&self) -> specrag_core::Result<u64> {
            Ok(0)
        }
    }

    struct MockLlm {
        generate_calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
        fail_on_call: Option<usize>,
    }

    impl MockLlm {
        fn new() -> Self {
            Self {
                generate_calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
                fail_on_call: None,
            }
        }

        fn failing_on(call: usize) -> Self {
            Self {
                fail_on_call: Some(call),
                ..Self::new()
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for MockLlm {
        async fn generate(&self, prompt: &str, _temperature: f32) -> specrag_core::Result<String> {
            let call = self.generate_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_call == Some(call) {
                return Err(SpecRagError::Generation("model unavailable".to_string()));
            }
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(format!("answer-{call}"))
        }
    }

    fn scored(text: &str, score: f32) -> ScoredChunk {
        let mut metadata = HashMap::new();
        metadata.insert(META_SOURCE.to_string(), "spec.md".to_string());
        ScoredChunk {
            chunk: Chunk::new(text, metadata),
            score,
        }
    }

    fn corpus() -> Vec<ScoredChunk> {
        vec![
            scored("alpha", 0.9),
            scored("beta", 0.8),
            scored("gamma", 0.7),
            scored("delta", 0.6),
            scored("epsilon", 0.5),
        ]
    }

    #[tokio::test]
    async fn test_single_question_one_retrieval_one_generation() {
        let store = MockStore::with_results(corpus());
        let llm = MockLlm::new();

        let answer = ask(&store, &llm, "What is X?", &AskOptions::default())
            .await
            .unwrap();

        assert_eq!(answer, "answer-0");
        assert_eq!(store.search_calls.load(Ordering::SeqCst), 1);
        assert_eq!(llm.generate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prompt_contains_top_k_in_score_order() {
        let store = MockStore::with_results(corpus());
        let llm = MockLlm::new();

        ask(&store, &llm, "What is X?", &AskOptions::default())
            .await
            .unwrap();

        let prompts = llm.prompts.lock().unwrap();
        let prompt = &prompts[0];

        // Default num_docs is 4: epsilon is cut.
        assert!(prompt.contains("[Chunk 1: spec.md / ]\nalpha"));
        assert!(prompt.contains("[Chunk 2: spec.md / ]\nbeta"));
        assert!(prompt.contains("[Chunk 3: spec.md / ]\ngamma"));
        assert!(prompt.contains("[Chunk 4: spec.md / ]\ndelta"));
        assert!(!prompt.contains("epsilon"));
    }

    #[tokio::test]
    async fn test_piped_question_chains_previous_answer() {
        let store = MockStore::with_results(corpus());
        let llm = MockLlm::new();

        let answer = ask(&store, &llm, "A|B", &AskOptions::default())
            .await
            .unwrap();

        assert_eq!(answer, "answer-1");
        assert_eq!(store.search_calls.load(Ordering::SeqCst), 2);
        assert_eq!(llm.generate_calls.load(Ordering::SeqCst), 2);

        let queries = store.queries.lock().unwrap();
        assert_eq!(queries.as_slice(), ["A", "B"]);

        let prompts = llm.prompts.lock().unwrap();
        assert!(!prompts[0].contains("answer-0"));
        assert!(prompts[1].contains("answer-0"));
        assert!(prompts[1].contains("Question: B"));
    }

    #[tokio::test]
    async fn test_retrieval_failure_aborts_chain() {
        let store = MockStore::failing();
        let llm = MockLlm::new();

        let err = ask(&store, &llm, "A|B", &AskOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SpecRagError::Retrieval(_)));
        assert_eq!(llm.generate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_mid_chain_returns_no_partial_answer() {
        let store = MockStore::with_results(corpus());
        let llm = MockLlm::failing_on(1);

        let err = ask(&store, &llm, "A|B|C", &AskOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SpecRagError::Generation(_)));
        // The third round never runs.
        assert_eq!(store.search_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_num_docs_override() {
        let store = MockStore::with_results(corpus());
        let llm = MockLlm::new();
        let options = AskOptions {
            num_docs: 2,
            ..AskOptions::default()
        };

        ask(&store, &llm, "q", &options).await.unwrap();

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("alpha"));
        assert!(prompts[0].contains("beta"));
        assert!(!prompts[0].contains("gamma"));
    }
}

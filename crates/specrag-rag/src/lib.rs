//! specrag RAG - Retrieval-augmented answering over the spec corpus
//!
//! This crate implements the two top-level pipelines:
//! - `sync`: fetch the corpus, chunk it, and full-replace the vector index
//! - `ask`: answer a pipe-delimited chain of sub-questions, each round
//!   retrieving context, composing a prompt, and calling the LLM, with the
//!   previous sub-answer chained into the next prompt

pub mod ask;
pub mod llm;
pub mod prompt;
pub mod sync;

pub use ask::{ask, AskOptions, DEFAULT_NUM_DOCS};
pub use llm::{create_llm_client, OllamaClient, OpenAiClient};
pub use prompt::{default_prompt, PromptBuilder, PromptFn};
pub use sync::sync;

//! specrag CLI
//!
//! Usage:
//!   specrag sync
//!   specrag ask "<question>"
//!
//! Questions may chain sub-questions with a literal `|`: each sub-answer
//! feeds the next prompt, and the final sub-answer is printed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use specrag_chunker::{Chunker, MarkdownChunker, SentenceChunker};
use specrag_core::AppConfig;
use specrag_rag::{ask, create_llm_client, sync, AskOptions};
use specrag_source::GitHubSource;
use specrag_vector::{create_embedding_client, EmbeddingClient, IndexManager, QdrantStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "specrag")]
#[command(about = "Retrieval-augmented question answering over the MongoDB specifications")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file; environment variables apply otherwise
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the corpus, chunk it, and replace the vector index contents
    Sync {
        /// Chunking strategy
        #[arg(long, value_enum, default_value_t = ChunkerKind::Markdown)]
        chunker: ChunkerKind,
    },
    /// Answer a question (chain sub-questions with `|`)
    Ask {
        /// Question to ask
        question: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ChunkerKind {
    /// Heading-aware splitting with a token budget
    Markdown,
    /// Sentence grouping with a word budget
    Sentence,
}

fn load_config(path: Option<&str>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_file(path).context("failed to load config file"),
        None => AppConfig::from_env().context("failed to load config from environment"),
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    if config.logging.json_format {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Connect to the vector store and drive its index to the queryable state
async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<QdrantStore>> {
    let embedder: Arc<dyn EmbeddingClient> = Arc::from(create_embedding_client(&config.llm)?);
    let store = Arc::new(QdrantStore::new(&config.vector, embedder)?);

    let manager = IndexManager::new(store.clone())
        .with_poll_interval(Duration::from_secs(config.vector.poll_interval_secs));
    manager
        .ensure_ready(
            &config.vector.index_spec(),
            Duration::from_secs(config.vector.ready_timeout_secs),
        )
        .await?;

    Ok(store)
}

fn build_chunker(kind: ChunkerKind, config: &AppConfig) -> anyhow::Result<Box<dyn Chunker>> {
    let chunker: Box<dyn Chunker> = match kind {
        ChunkerKind::Markdown => Box::new(MarkdownChunker::new(
            &config.llm.embedding_model,
            config.rag.chunk_size,
            config.rag.chunk_overlap,
        )?),
        ChunkerKind::Sentence => Box::new(SentenceChunker::new(
            config.rag.chunk_size,
            config.rag.chunk_overlap,
        )?),
    };
    Ok(chunker)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config);

    match cli.command {
        Commands::Sync { chunker } => {
            let store = open_store(&config).await?;
            let source = GitHubSource::new(config.source.clone())?;
            let chunker = build_chunker(chunker, &config)?;

            sync(&source, chunker.as_ref(), store.as_ref()).await?;
            tracing::info!("sync complete");
        }
        Commands::Ask { question } => {
            let store = open_store(&config).await?;
            let llm = create_llm_client(&config.llm)?;

            let options = AskOptions {
                num_docs: config.rag.num_docs,
                temperature: config.llm.temperature,
                ..AskOptions::default()
            };

            let answer = ask(store.as_ref(), llm.as_ref(), &question, &options).await?;
            println!("{answer}");
        }
    }

    Ok(())
}

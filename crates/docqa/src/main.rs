//! # docqa CLI
//!
//! The `docqa` binary answers questions about plain-text documents using a
//! remote inference backend with an ordered model fallback chain.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa serve` | Start the HTTP API |
//! | `docqa chunk <file>` | Segment a text file and print a chunk summary |
//! | `docqa ask <file> "<question>"` | One-shot question against a text file |
//!
//! ## Examples
//!
//! ```bash
//! # Start the API
//! docqa serve --config ./docqa.toml
//!
//! # Inspect how a document would be segmented
//! docqa chunk ./notes.txt --max-chunk-size 500
//!
//! # Ask a one-shot question
//! docqa ask ./notes.txt "What is the budget?"
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use docqa::config::{load_config, Config};
use docqa::orchestrator::Orchestrator;
use docqa::server::run_server;
use docqa_core::models::Document;
use docqa_core::{rank, segment};

#[derive(Parser)]
#[command(
    name = "docqa",
    version,
    about = "Document question answering with lexical retrieval and model fallback"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server.
    Serve,
    /// Segment a text file and print a chunk summary.
    Chunk {
        file: PathBuf,
        /// Override the configured maximum chunk size (characters).
        #[arg(long)]
        max_chunk_size: Option<usize>,
    },
    /// Ask a one-shot question about a text file.
    Ask { file: PathBuf, question: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docqa=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Command::Serve => run_server(&config).await,
        Command::Chunk {
            file,
            max_chunk_size,
        } => cmd_chunk(
            &file,
            max_chunk_size.unwrap_or(config.chunking.max_chunk_size),
        ),
        Command::Ask { file, question } => cmd_ask(&config, &file, &question).await,
    }
}

fn read_document(file: &Path) -> Result<String> {
    std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read document: {}", file.display()))
}

fn cmd_chunk(file: &Path, max_chunk_size: usize) -> Result<()> {
    let text = read_document(file)?;
    let chunks = segment::segment(&text, max_chunk_size)?;

    println!("{} chunks (max {} chars each):", chunks.len(), max_chunk_size);
    for chunk in &chunks {
        let preview: String = chunk.text.chars().take(60).collect();
        println!(
            "  [{}] {:>4} chars  {}",
            chunk.index,
            chunk.text.chars().count(),
            preview
        );
    }
    Ok(())
}

async fn cmd_ask(config: &Config, file: &Path, question: &str) -> Result<()> {
    let text = read_document(file)?;
    let document = Document::new(text, config.chunking.max_chunk_size)?;
    let ranked = rank::rank(question, document.chunks(), config.retrieval.top_k);

    let orchestrator = Orchestrator::new(config.backend.clone(), config.retrieval.clone())?;
    let answer = orchestrator
        .answer(question, &ranked, document.raw_text())
        .await?;

    println!("{}", answer.answer);
    println!();
    println!(
        "model: {}  time: {:.2}s  context chunks: {}",
        answer.model_used, answer.processing_time, answer.relevant_chunks
    );
    Ok(())
}

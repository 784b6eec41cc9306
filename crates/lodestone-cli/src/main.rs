//! Lodestone CLI - ingest documents and retrieve context for questions.
//!
//! # Usage
//!
//! ```bash
//! # Index a plain-text document (pages separated by form feeds)
//! lodestone ingest handbook handbook.txt
//!
//! # Retrieve context
//! lodestone ask "How do refunds work?"
//! lodestone ask "shipping times" --document handbook -n 3 --json
//!
//! # Manage documents
//! lodestone list
//! lodestone delete handbook
//! ```

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lodestone_core::metrics::global_metrics;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Lodestone retrieval CLI.
///
/// Splits documents into overlapping chunks, embeds them, and finds the
/// chunks most relevant to a question.
#[derive(Parser)]
#[command(name = "lodestone", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Custom data directory (default: platform standard location)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Retrieval settings as a JSON file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging and print metrics after the command
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Index a plain-text document, replacing any earlier version
    Ingest {
        /// Identifier to store the document under
        document_id: String,
        /// Text file; form feeds separate pages
        file: PathBuf,
    },
    /// Retrieve the chunks most relevant to a question
    Ask {
        /// Question text
        query: String,

        /// Restrict the search to this document (repeatable)
        #[arg(long = "document")]
        documents: Vec<String>,

        /// Maximum number of results to return
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Minimum similarity for a result
        #[arg(long)]
        threshold: Option<f32>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },
    /// List indexed documents
    List,
    /// Remove a document and all its chunks
    Delete {
        document_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let retrieval = config::load_retrieval_config(cli.config.as_deref())?;
    let pipeline = commands::open_pipeline(cli.data_dir.as_ref(), retrieval)?;

    match cli.command {
        Command::Ingest { document_id, file } => {
            let report = commands::ingest(&pipeline, &document_id, &file).await?;
            println!("{}", output::format_ingest(&report));
        }
        Command::Ask {
            query,
            documents,
            limit,
            threshold,
            json,
        } => {
            let answer = commands::ask(&pipeline, &query, &documents, limit, threshold).await?;
            let rendered = if json {
                output::format_json(&query, &answer)
            } else {
                output::format_human(&query, &answer)
            };
            println!("{}", rendered);
        }
        Command::List => {
            let documents = commands::list(&pipeline).await?;
            println!("{}", output::format_documents(&documents));
        }
        Command::Delete { document_id } => {
            let removed = commands::delete(&pipeline, &document_id).await?;
            println!("Deleted \"{}\" ({} chunks)", document_id, removed);
        }
    }

    if cli.verbose {
        eprintln!(
            "{}",
            output::format_metrics(&global_metrics().snapshot(), &pipeline.worker_stats())
        );
    }

    Ok(())
}

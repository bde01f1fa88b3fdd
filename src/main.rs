mod app;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use pdfqa_cli::{Repl, render_answer, render_ingest_error, render_summary};
use pdfqa_rag::{PdfQaService, RagConfig};

use crate::app::{Mode, build_service, require_persistent_index};

#[derive(Parser)]
#[command(name = "pdfqa", version)]
#[command(about = "Ask questions about PDF documents and get answers with page citations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest PDFs into the configured index
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Ask a single question in a fresh session
    Ask {
        /// PDF to ingest before asking (repeatable)
        #[arg(long = "pdf")]
        pdfs: Vec<PathBuf>,
        /// Print the retrieved contexts
        #[arg(long)]
        trace: bool,
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Interactive multi-turn chat (default)
    Chat {
        /// PDF to ingest before the first question (repeatable)
        #[arg(long = "pdf")]
        pdfs: Vec<PathBuf>,
        /// Resume or name a session
        #[arg(long)]
        session: Option<String>,
        /// Print the retrieved contexts after every answer
        #[arg(long)]
        trace: bool,
    },
    /// Remove every chunk from the configured index
    Reset,
}

/// Ingest each file, printing one line per file; returns the number of failures
async fn ingest_all(service: &PdfQaService, files: &[PathBuf]) -> usize {
    let mut failures = 0;
    for file in files {
        match service.ingest(file).await {
            Ok(summary) => println!("{}", render_summary(&summary)),
            Err(e) => {
                failures += 1;
                println!("{}", render_ingest_error(&file.display().to_string(), &e));
            }
        }
    }
    failures
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = RagConfig::from_env()?;

    match cli.command.unwrap_or(Commands::Chat {
        pdfs: Vec::new(),
        session: None,
        trace: false,
    }) {
        Commands::Ingest { files } => {
            require_persistent_index(&config, "ingest")?;
            let service = build_service(&config, Mode::IndexOnly).await?;
            let failures = ingest_all(&service, &files).await;
            if failures > 0 {
                bail!("{} of {} file(s) failed to ingest", failures, files.len());
            }
        }
        Commands::Ask {
            pdfs,
            trace,
            question,
        } => {
            let service = build_service(&config, Mode::Chat).await?;
            ingest_all(&service, &pdfs).await;

            let session_id = service.new_session_id();
            let response = service.chat(&session_id, &question.join(" ")).await?;
            println!("{}", render_answer(&response, trace));
        }
        Commands::Chat {
            pdfs,
            session,
            trace,
        } => {
            let service = build_service(&config, Mode::Chat).await?;
            ingest_all(&service, &pdfs).await;

            let mut repl = Repl::new(Arc::clone(&service), session).with_trace(trace);
            repl.run().await?;
        }
        Commands::Reset => {
            require_persistent_index(&config, "reset")?;
            let service = build_service(&config, Mode::IndexOnly).await?;
            service.reset().await?;
            println!("{}", "Index cleared.".green());
        }
    }

    Ok(())
}

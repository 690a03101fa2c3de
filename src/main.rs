//! # Glossary Harness CLI (`gloss`)
//!
//! ## Usage
//!
//! ```bash
//! gloss --config ./gloss.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `gloss run` | Clone or reuse the repository and extract pending documents |
//! | `gloss status` | Show working copy origin, checkpoint and term counts |
//! | `gloss list` | List candidate documents and their state |
//!
//! Logging goes to stderr and is controlled with `-v` / `-vv` or `RUST_LOG`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use glossary_harness::config;
use glossary_harness::ingest::{self, RunOptions};
use glossary_harness::progress::ProgressMode;
use glossary_harness::status;

/// Glossary Harness: extract a glossary from a documentation repository
/// with an LLM, one document at a time, resumably.
#[derive(Parser)]
#[command(
    name = "gloss",
    version,
    about = "Resumable LLM-driven glossary extraction over a documentation repository",
    long_about = "Glossary Harness clones a documentation repository, sends each document to an \
    LLM with a fixed term schema, and merges the returned terms into a JSON glossary. \
    Completed documents are checkpointed so interrupted runs resume where they stopped."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Relative paths inside it resolve against the file's directory.
    #[arg(long, global = true, default_value = "./gloss.toml")]
    config: PathBuf,

    /// Verbose logging (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract terms from every pending document.
    ///
    /// Clones the repository if needed (re-cloning and resetting state if
    /// its URL changed), then processes documents that are not checkpointed,
    /// not ignored, and not the glossary-definition file itself.
    Run {
        /// Number of extraction calls in flight (overrides `run.workers`).
        #[arg(long)]
        workers: Option<usize>,

        /// Show what would be extracted without calling the LLM.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of documents to extract in this run.
        #[arg(long)]
        limit: Option<usize>,

        /// Progress output on stderr. Defaults to `human` on a TTY, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Show the working copy, its origin, and store sizes.
    Status,

    /// List candidate documents with their state (done, ignored, self, pending).
    List {
        /// Only show pending documents.
        #[arg(long)]
        pending: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Run {
            workers,
            dry_run,
            limit,
            progress,
        } => {
            if let Some(n) = workers {
                if n == 0 || n > config::MAX_WORKERS {
                    anyhow::bail!("--workers must be between 1 and {}", config::MAX_WORKERS);
                }
            }
            let opts = RunOptions {
                workers,
                dry_run,
                limit,
                progress: progress.unwrap_or_else(ProgressMode::default_for_tty),
            };
            let summary = ingest::run_ingest(&cfg, &opts).await?;
            summary.print(dry_run);
        }
        Commands::Status => {
            status::run_status(&cfg)?;
        }
        Commands::List { pending } => {
            status::run_list(&cfg, pending)?;
        }
    }

    Ok(())
}

fn setup_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "glossary_harness=info",
        1 => "glossary_harness=debug",
        _ => "glossary_harness=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

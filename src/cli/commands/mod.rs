//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod crawl;
mod gazettes;
mod helpers;
mod init;
mod jobs;
mod queue;
mod worker;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "radar")]
#[command(about = "Official gazette acquisition pipeline")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema and seed the known institutions
    Init,

    /// Run the job scheduler until interrupted
    Worker {
        /// Number of concurrent jobs (overrides config)
        #[arg(short, long)]
        workers: Option<u32>,
        /// Don't register the periodic fetch and reindex jobs
        #[arg(long)]
        no_periodic: bool,
    },

    /// Fetch one source right now and store new gazettes
    Crawl {
        /// Source slug (governo-pi, municipios-pi)
        slug: String,
        /// Publication date (YYYY-MM-DD), for sources that list by date
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Queue a job for the worker
    Enqueue {
        /// Job kind (fetch_governo_piaui, fetch_diario_dos_municipios, reindex_knowledge_bases)
        kind: String,
        /// Target date (YYYY-MM-DD), for kinds that take one
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Trigger reindexing for knowledge bases with pending gazettes
    Reindex,

    /// Inspect and maintain the job queue
    Jobs {
        #[command(subcommand)]
        command: JobsCommands,
    },

    /// Inspect stored gazettes
    Gazettes {
        #[command(subcommand)]
        command: GazettesCommands,
    },
}

#[derive(Subcommand)]
enum JobsCommands {
    /// List recent jobs
    List {
        /// Filter by state (scheduled, running, completed, retryable, discarded)
        #[arg(short, long)]
        state: Option<String>,
        /// Maximum number of jobs to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
    /// Delete finished jobs past their retention period
    Purge,
}

#[derive(Subcommand)]
enum GazettesCommands {
    /// List gazettes awaiting a reindex trigger
    Pending,
    /// List recently stored gazettes
    List {
        /// Only this source (slug)
        #[arg(short, long)]
        source: Option<String>,
        /// Maximum number of gazettes to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
}

/// Parse arguments, load settings and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
    };
    let (mut settings, _config) = load_settings_with_options(options)
        .await
        .map_err(anyhow::Error::msg)
        .context("failed to load configuration")?;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Worker {
            workers,
            no_periodic,
        } => {
            if let Some(workers) = workers {
                settings.scheduler.workers = workers;
            }
            worker::cmd_worker(&settings, !no_periodic).await
        }
        Commands::Crawl { slug, date } => crawl::cmd_crawl(&settings, &slug, date.as_deref()).await,
        Commands::Enqueue { kind, date } => {
            queue::cmd_enqueue(&settings, &kind, date.as_deref()).await
        }
        Commands::Reindex => queue::cmd_reindex(&settings).await,
        Commands::Jobs { command } => match command {
            JobsCommands::List { state, limit } => {
                jobs::cmd_jobs_list(&settings, state.as_deref(), limit).await
            }
            JobsCommands::Purge => jobs::cmd_jobs_purge(&settings).await,
        },
        Commands::Gazettes { command } => match command {
            GazettesCommands::Pending => gazettes::cmd_gazettes_pending(&settings).await,
            GazettesCommands::List { source, limit } => {
                gazettes::cmd_gazettes_list(&settings, source.as_deref(), limit).await
            }
        },
    }
}

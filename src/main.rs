//! PaperLens command line: process a folder of papers, inspect or reset the store.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use thiserror::Error;

use paperlens::config::{self, AppConfig, ConfigError};
use paperlens::db::{DatabaseError, SqlitePaperStore};
use paperlens::pipeline::processor::{build_processor, ProcessingError};

#[derive(Parser)]
#[command(name = "paperlens")]
#[command(about = "Extract structured metadata from research-paper PDFs")]
#[command(version)]
struct Cli {
    /// SQLite database file (overrides PAPERLENS_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every PDF in a folder through the pipeline
    Process {
        /// Folder of PDFs (overrides PAPERLENS_PAPERS_DIR)
        dir: Option<PathBuf>,

        /// Built-in research scope (overrides PAPERLENS_SCOPE)
        #[arg(long)]
        scope: Option<String>,

        /// Free-form relevancy topic (overrides PAPERLENS_TOPIC)
        #[arg(long, conflicts_with = "scope")]
        topic: Option<String>,
    },

    /// Drop all stored papers and recreate the schema
    ResetDb,

    /// Print one stored paper, or all of them, as JSON
    Show {
        /// Path of the paper as it was processed
        path: Option<PathBuf>,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Cannot render output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No stored paper for {0}")]
    NotFound(PathBuf),
}

fn main() -> ExitCode {
    // Load environment variables
    let _ = dotenvy::dotenv();
    paperlens::init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    if let Err(e) = run() {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    match cli.command {
        Commands::Process { dir, scope, topic } => {
            if let Some(dir) = dir {
                config.papers_dir = dir;
            }
            if let Some(name) = scope {
                config.scope = config::parse_scope(&name)?;
            }
            if let Some(topic) = topic {
                config.scope = paperlens::pipeline::oracle::ResearchScope::custom(&topic);
            }
            cmd_process(&config)
        }
        Commands::ResetDb => cmd_reset(&config.db_path),
        Commands::Show { path } => cmd_show(&config.db_path, path.as_deref()),
    }
}

fn cmd_process(config: &AppConfig) -> Result<(), CliError> {
    let processor = build_processor(config)?;
    let summary = processor.process_directory(&config.papers_dir)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn cmd_reset(db_path: &Path) -> Result<(), CliError> {
    let store = SqlitePaperStore::open(db_path)?;
    store.reset()?;
    println!("Database reset: {}", db_path.display());
    Ok(())
}

fn cmd_show(db_path: &Path, path: Option<&Path>) -> Result<(), CliError> {
    let store = SqlitePaperStore::open(db_path)?;
    let json = match path {
        Some(path) => {
            let paper = store
                .get(path)?
                .ok_or_else(|| CliError::NotFound(path.to_path_buf()))?;
            serde_json::to_string_pretty(&paper)?
        }
        None => serde_json::to_string_pretty(&store.list()?)?,
    };
    println!("{json}");
    Ok(())
}

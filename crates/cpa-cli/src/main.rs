//! Operator CLI for CPA synchronization
//!
//! Read-only tooling: decode quarantine filenames, list which quarantine
//! files are due, and build the inventory a sync run would see.

use anyhow::Result;
use clap::{Parser, Subcommand};
use cpa_effects::RealClockHandler;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{due, inspect, inventory};

#[derive(Parser)]
#[command(name = "cpa-sync")]
#[command(about = "CPA synchronization and quarantine activation tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (TOML); built-in defaults when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a quarantine filename and report whether it is due now
    Inspect {
        /// Quarantine filename, e.g. 01230800_nav.60120._R_Zm9y._R_.qrntn
        filename: String,
    },

    /// Build the inventory of a local directory
    Inventory {
        /// Directory holding the active CPA files
        #[arg(short, long)]
        root: PathBuf,

        /// Print JSON instead of `id  timestamp` lines
        #[arg(long)]
        json: bool,
    },

    /// List quarantine files in a local directory that are due now
    Due {
        /// Directory holding the quarantine files
        #[arg(short, long)]
        root: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;
    tracing::debug!(
        directory = %config.directory,
        timezone = %config.timezone,
        due_policy = ?config.due_policy,
        "Loaded configuration"
    );
    let clock = RealClockHandler::new();

    let output = match cli.command {
        Commands::Inspect { filename } => inspect::run(&filename, &config, &clock)?,
        Commands::Inventory { root, json } => inventory::run(&root, json).await?,
        Commands::Due { root } => due::run(&root, &config, &clock).await?,
    };
    print!("{output}");
    Ok(())
}

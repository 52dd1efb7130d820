//! Zentry CLI
//!
//! Maintenance tools for Zentry ledger logs.
//!
//! # Commands
//!
//! - `inspect` - Display log statistics and key counts
//! - `verify` - Scan the log and report anything recovery would skip
//! - `dump` - Dump raw records for debugging
//! - `history` - Show the current value and history of one key

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Zentry command-line ledger tools.
#[derive(Parser)]
#[command(name = "zentry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the ledger log file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display log statistics and key counts
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify log integrity without modifying it
    Verify,

    /// Dump log records for debugging
    Dump {
        /// Maximum number of records to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Start from this byte offset
        #[arg(short, long, default_value = "0")]
        offset: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the current value and history of a logical key
    History {
        /// Logical key, e.g. "USD -> IDR"
        key: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Log path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Log path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::Dump {
            limit,
            offset,
            format,
        } => {
            let path = cli.path.ok_or("Log path required for dump")?;
            commands::dump::run(&path, limit, offset, &format)?;
        }
        Commands::History { key, format } => {
            let path = cli.path.ok_or("Log path required for history")?;
            commands::history::run(&path, &key, &format)?;
        }
        Commands::Version => {
            println!("Zentry CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Zentry Core v{}", zentry_core::VERSION);
        }
    }

    Ok(())
}

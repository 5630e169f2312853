//! HistoDB CLI
//!
//! Command-line harness that drives the versioning engine against an
//! in-memory store.
//!
//! # Commands
//!
//! - `demo` - Run the insert/update/delete scenario and print the history
//! - `replay` - Replay a JSON script of mutations and lookups
//! - `version` - Show version information

mod commands;
mod json;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// HistoDB command-line harness.
#[derive(Parser)]
#[command(name = "histodb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the insert/update/delete scenario and print the history
    Demo {
        /// Identity recorded as editor and deleter
        #[arg(short, long, default_value = "demo")]
        user: String,
    },

    /// Replay a JSON script of mutations and lookups
    Replay {
        /// Path to the script file
        script: PathBuf,

        /// Pretty-print each step's result
        #[arg(short, long)]
        pretty: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Demo { user } => commands::demo::run(&user)?,
        Commands::Replay { script, pretty } => commands::replay::run(&script, pretty)?,
        Commands::Version => {
            println!("HistoDB CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

//! CLI command definitions and handlers

mod blame;
mod config;
mod init;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// scm-activity - per-line SCM measures for code analysis
#[derive(Parser, Debug)]
#[command(name = "scm-activity")]
#[command(
    version,
    about = "Attach per-line author, commit date and revision measures to analyzed files",
    after_help = "\
Examples:
  scm-activity init                              Create scm-activity.toml
  scm-activity config                            Show the effective SCM settings
  scm-activity blame src/main.rs                 Print measures for one file
  scm-activity blame src/*.rs --format json      JSON output for scripting
  scm-activity blame src/*.rs --store m.json     Update a measure store"
)]
pub struct Cli {
    /// Project base directory (default: current directory)
    #[arg(long, short = 'p', global = true, default_value = ".")]
    pub path: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel workers (1-64)
    #[arg(long, global = true, default_value = "8", value_parser = parse_workers)]
    pub workers: usize,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a scm-activity.toml config file with example settings
    Init,

    /// Show the effective SCM configuration
    Config,

    /// Compute SCM measures for files
    Blame {
        /// Files to blame
        #[arg(required = true, value_name = "FILES")]
        files: Vec<PathBuf>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// JSON measure store to update (previous measures are kept on blame failure)
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init => init::run(&cli.path),
        Commands::Config => config::run(&cli.path),
        Commands::Blame {
            files,
            format,
            store,
        } => blame::run(&cli.path, &files, &format, store.as_deref(), cli.workers),
    }
}

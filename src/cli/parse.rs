//! CLI parse: clap types for strata. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Strata CLI - recursive, content-addressed snapshots of filesystem trees
#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Snapshot, inspect, merge and export filesystem trees")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stderr, stdout, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Abort snapshot, log and merge after this many seconds
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record the current state of a file or directory and print its hash
    Snapshot {
        /// Path to snapshot
        path: PathBuf,
    },
    /// Show the history of a snapshot
    Log {
        /// Snapshot hash or snapshotted path
        name: String,
        /// Output format
        #[arg(long, value_enum, default_value_t = LogFormat::Text)]
        format: LogFormat,
        /// Show at most this many entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Merge two snapshots and print the merged hash and any conflicts
    Merge {
        /// Our side: snapshot hash or snapshotted path
        ours: String,
        /// Their side: snapshot hash or snapshotted path
        theirs: String,
    },
    /// Write a snapshot out to a new directory or file
    Export {
        /// Snapshot hash or snapshotted path
        name: String,
        /// Destination; must not exist
        destination: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

//! CLI route: single route table and run context. Dispatches to the engine and presentation.

use crate::cancel::Cancellation;
use crate::cli::parse::{Commands, LogFormat};
use crate::cli::presentation::{
    format_log_json, format_log_text, format_merge_result, format_snapshot_result,
};
use crate::config::StrataConfig;
use crate::error::EngineError;
use crate::snapshot::{ancestors, export, resolve, Merger, Snapshotter};
use crate::store::{SledStorage, Storage};
use std::io::IsTerminal;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Runtime context for CLI execution: loaded configuration and the opened store.
pub struct RunContext {
    config: StrataConfig,
    storage: SledStorage,
    cancel: Cancellation,
}

impl RunContext {
    /// Open the store named by `config`. The configured timeout starts now.
    pub fn new(config: StrataConfig) -> Result<Self, EngineError> {
        let storage = SledStorage::open(&config.store.path, config.snapshot.exclude_rules())?;
        let cancel = config.snapshot.cancellation();
        Ok(Self {
            config,
            storage,
            cancel,
        })
    }

    pub fn storage(&self) -> &SledStorage {
        &self.storage
    }

    /// Token observed by snapshot, log and merge; cancel it to abort them.
    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, EngineError> {
        let started = Instant::now();
        let result = self.execute_inner(command);
        // Persist whatever was written, even when the command failed part way.
        self.storage.flush()?;
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, EngineError> {
        match command {
            Commands::Snapshot { path } => self.handle_snapshot(path),
            Commands::Log {
                name,
                format,
                limit,
            } => {
                let start = resolve(&self.storage, name)?;
                let entries = ancestors(&self.storage, start)
                    .with_cancellation(self.cancel.clone())
                    .take(limit.unwrap_or(usize::MAX))
                    .collect::<Result<Vec<_>, _>>()?;
                match format {
                    LogFormat::Text => Ok(format_log_text(
                        &entries,
                        std::io::stdout().is_terminal(),
                    )),
                    LogFormat::Json => format_log_json(&entries),
                }
            }
            Commands::Merge { ours, theirs } => {
                let ours = resolve(&self.storage, ours)?;
                let theirs = resolve(&self.storage, theirs)?;
                let outcome = Merger::new(&self.storage)
                    .with_cancellation(self.cancel.clone())
                    .merge(ours, theirs)?;
                Ok(format_merge_result(&outcome))
            }
            Commands::Export { name, destination } => {
                let hash = resolve(&self.storage, name)?;
                export(&self.storage, hash, destination)?;
                Ok(format!("Exported {} to {}", hash, destination.display()))
            }
        }
    }

    fn handle_snapshot(&self, path: &Path) -> Result<String, EngineError> {
        let snapshot = &self.config.snapshot;
        let mut snapshotter = Snapshotter::new(&self.storage)
            .with_detector(snapshot.detector())
            .with_cancellation(self.cancel.clone());
        if snapshot.threads > 0 {
            snapshotter = snapshotter.with_threads(snapshot.threads)?;
        }
        match snapshotter.snapshot(path)? {
            Some((hash, _)) => Ok(format_snapshot_result(&hash)),
            None => Err(EngineError::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "path does not exist or is excluded",
                ),
            )),
        }
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Snapshot { .. } => "snapshot",
        Commands::Log { .. } => "log",
        Commands::Merge { .. } => "merge",
        Commands::Export { .. } => "export",
    }
}

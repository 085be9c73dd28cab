//! Configuration System
//!
//! Layered configuration for the snapshot engine and CLI. Sources, lowest
//! precedence first: built-in defaults, the global config file, an explicit
//! `--config` file, and `STRATA__*` environment variables
//! (`STRATA__SNAPSHOT__THREADS=4` sets `snapshot.threads`).

use crate::cache::{AlwaysRehash, ChangeDetector, MetadataCache};
use crate::cancel::Cancellation;
use crate::error::EngineError;
use crate::ignore::{ExcludeRules, BUILTIN_DEFAULTS};
use crate::logging::LoggingConfig;
use config::Environment;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

mod merge;
mod sources;

pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrataConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub snapshot: SnapshotConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the object store lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory of the sled database
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Data directory store, e.g. `$XDG_DATA_HOME/strata/store`.
pub fn default_store_path() -> PathBuf {
    ProjectDirs::from("", "", "strata")
        .map(|dirs| dirs.data_dir().join("store"))
        .unwrap_or_else(|| PathBuf::from(".strata").join("store"))
}

/// Snapshot builder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// File-name patterns never snapshotted: `name`, `*suffix` or `prefix*`
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// Worker threads for sibling parallelism (0 = one per CPU)
    #[serde(default)]
    pub threads: usize,

    /// Change-detection policy
    #[serde(default)]
    pub cache: CachePolicy,

    /// Abort snapshot, log and merge commands after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_ignore() -> Vec<String> {
    BUILTIN_DEFAULTS.iter().map(|s| s.to_string()).collect()
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            ignore: default_ignore(),
            threads: 0,
            cache: CachePolicy::default(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Trust unchanged filesystem metadata
    #[default]
    Metadata,
    /// Rehash every leaf on every snapshot
    Rehash,
}

impl SnapshotConfig {
    pub fn exclude_rules(&self) -> ExcludeRules {
        ExcludeRules::new(&self.ignore)
    }

    pub fn detector(&self) -> Arc<dyn ChangeDetector> {
        match self.cache {
            CachePolicy::Metadata => Arc::new(MetadataCache::default()),
            CachePolicy::Rehash => Arc::new(AlwaysRehash),
        }
    }

    /// Cancellation token whose deadline starts now.
    pub fn cancellation(&self) -> Cancellation {
        match self.timeout_secs {
            Some(secs) => Cancellation::with_timeout(Duration::from_secs(secs)),
            None => Cancellation::new(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Store(String),
    Snapshot(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Store(msg) => write!(f, "Store: {}", msg),
            ValidationError::Snapshot(msg) => write!(f, "Snapshot: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl StrataConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.store.path.as_os_str().is_empty() {
            errors.push(ValidationError::Store("Store path cannot be empty".to_string()));
        }

        for pattern in &self.snapshot.ignore {
            if pattern.is_empty() || pattern == "*" || pattern.contains('/') {
                errors.push(ValidationError::Snapshot(format!(
                    "Invalid ignore pattern '{}' (expected a file name, '*suffix' or 'prefix*')",
                    pattern
                )));
            }
        }

        if self.snapshot.timeout_secs == Some(0) {
            errors.push(ValidationError::Snapshot(
                "timeout_secs must be positive".to_string(),
            ));
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Loads [`StrataConfig`] from its layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration, with `explicit` as the `--config` file.
    pub fn load(explicit: Option<&Path>) -> Result<StrataConfig, EngineError> {
        let mut builder = merge::merge_policy::builder_with_defaults()?;
        builder = sources::global_file::add_to_builder(builder)?;
        if let Some(path) = explicit {
            debug!(config_path = %path.display(), "Loading explicit configuration file");
            builder = sources::explicit_file::add_to_builder(builder, path)?;
        }
        builder = builder.add_source(
            Environment::with_prefix("STRATA")
                .separator("__")
                .try_parsing(true),
        );

        let config: StrataConfig = builder.build()?.try_deserialize()?;
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            EngineError::Config(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(config)
    }
}

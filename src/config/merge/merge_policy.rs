//! Merge rules: defaults, override order, conflict handling.

use crate::config::default_store_path;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("store.path", default_store_path().to_string_lossy().into_owned())?
        .set_default("snapshot.ignore", vec![".git"])?
        .set_default("snapshot.threads", 0)?
        .set_default("snapshot.cache", "metadata")
}

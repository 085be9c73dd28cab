//! Turn a command-line name into a snapshot hash.

use crate::error::EngineError;
use crate::store::Storage;
use crate::tree::path::{absolute_path, normalize_path_string};
use crate::types::Hash;
use std::path::Path;
use tracing::debug;

/// Resolve `name` as a hash literal, or else as a path with a recorded snapshot.
///
/// The path is looked up as typed first, then in NFC form.
pub fn resolve(storage: &dyn Storage, name: &str) -> Result<Hash, EngineError> {
    if let Ok(hash) = name.parse::<Hash>() {
        return Ok(hash);
    }
    let normalized = normalize_path_string(name);
    for candidate in [name, normalized.as_str()] {
        let path = absolute_path(Path::new(candidate))?;
        if let Some(hash) = storage.latest(&path)? {
            debug!(name, path = %path.display(), hash = %hash, "Resolved path");
            return Ok(hash);
        }
    }
    Err(EngineError::Resolution(name.to_string()))
}

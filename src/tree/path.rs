//! Path canonicalization and normalization utilities
//!
//! Stored paths are keyed by their exact bytes. Distinct names that are
//! canonically equivalent Unicode are distinct files on most filesystems, so
//! only user-typed names are ever NFC-normalized, and only as a fallback.

use crate::error::EngineError;
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Resolve a user-supplied path to the absolute form snapshots are indexed by.
///
/// The parent directory is canonicalized (symlinks, `..` and `.` resolved)
/// while the final component is kept as given, so a symlink argument names
/// the link itself. Paths that do not exist are joined onto the working
/// directory.
pub fn absolute_path(path: &Path) -> Result<PathBuf, EngineError> {
    let absolute = match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            canonical_or_joined(parent)?.join(name)
        }
        _ => canonical_or_joined(path)?,
    };
    Ok(absolute)
}

fn canonical_or_joined(path: &Path) -> Result<PathBuf, EngineError> {
    match dunce::canonicalize(path) {
        Ok(canonical) => Ok(canonical),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let cwd = std::env::current_dir().map_err(|e| EngineError::io(path, e))?;
            Ok(cwd.join(path))
        }
        Err(e) => Err(EngineError::io(path, e)),
    }
}

/// Key under which a path is stored in the path index and metadata cache.
///
/// The exact path bytes, minus trailing separators (except root).
pub fn path_key(path: &Path) -> Vec<u8> {
    let mut key = path.as_os_str().as_encoded_bytes().to_vec();
    while key.len() > 1 && key.last().is_some_and(|b| std::path::is_separator(*b as char)) {
        key.pop();
    }
    key
}

/// Normalize a user-typed path string (without filesystem access)
///
/// Normalizes Unicode to NFC and strips trailing separators (except root).
pub fn normalize_path_string(path: &str) -> String {
    let mut result: String = path.nfc().collect();
    if result.len() > 1 {
        while result.len() > 1 && (result.ends_with('/') || result.ends_with('\\')) {
            result.pop();
        }
    }
    result
}

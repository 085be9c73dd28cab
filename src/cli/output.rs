//! CLI output: error mapping from engine errors to stable CLI surface.

use crate::error::EngineError;

/// Map engine errors to a single line for stderr.
pub fn map_error(e: &EngineError) -> String {
    match e {
        EngineError::Resolution(name) => format!(
            "error: {:?} is neither a snapshot hash nor a snapshotted path",
            name
        ),
        EngineError::UnrelatedHistories { ours, theirs } => format!(
            "error: cannot merge {} and {}: no common ancestor",
            ours.short(),
            theirs.short()
        ),
        other => format!("error: {}", other),
    }
}

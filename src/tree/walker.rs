//! Directory enumeration for the snapshot builder

use crate::error::EngineError;
use crate::snapshot::codec::is_valid_name;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Immediate child of a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: String,
    pub path: PathBuf,
}

/// List the immediate children of `dir`, sorted by name.
///
/// Symbolic links are reported, never followed. Entry names must be UTF-8,
/// since snapshot records store them as text.
pub fn list_children(dir: &Path) -> Result<Vec<ChildEntry>, EngineError> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    let mut children = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            EngineError::io(path, io::Error::from(e))
        })?;
        let name = entry
            .file_name()
            .to_str()
            .filter(|name| is_valid_name(name))
            .ok_or_else(|| {
                EngineError::io(
                    entry.path(),
                    io::Error::new(io::ErrorKind::InvalidData, "entry name is not valid UTF-8"),
                )
            })?
            .to_string();
        children.push(ChildEntry {
            name,
            path: entry.into_path(),
        });
    }
    Ok(children)
}

//! Materialize a stored snapshot back onto the filesystem.

use super::{File, FileKind};
use crate::error::{EngineError, StorageError};
use crate::store::Storage;
use crate::types::Hash;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, trace, warn};

const OURS_MARKER: &[u8] = b"<<<<<<< ours\n";
const SEPARATOR_MARKER: &[u8] = b"=======\n";
const THEIRS_MARKER: &[u8] = b">>>>>>> theirs\n";

/// Write the snapshot `hash` to `destination`, which must not exist yet.
///
/// The tree is built under a hidden sibling and renamed into place once
/// complete, so a failed export leaves nothing behind. Conflicts between two
/// regular files become one file with conflict markers; any other conflict
/// is written as `<name>.ours` and `<name>.theirs` siblings.
#[instrument(skip(storage), fields(hash = %hash, destination = %destination.display()))]
pub fn export(storage: &dyn Storage, hash: Hash, destination: &Path) -> Result<(), EngineError> {
    if fs::symlink_metadata(destination).is_ok() {
        return Err(EngineError::DestinationExists(destination.to_path_buf()));
    }
    let file = storage.read_snapshot(&hash)?;

    let staging = staging_path(destination);
    if fs::symlink_metadata(&staging).is_ok() {
        return Err(EngineError::DestinationExists(staging));
    }
    if let Err(e) = materialize(storage, &file, &staging) {
        discard(&staging);
        return Err(e);
    }
    if fs::symlink_metadata(destination).is_ok() {
        discard(&staging);
        return Err(EngineError::DestinationExists(destination.to_path_buf()));
    }
    fs::rename(&staging, destination).map_err(|e| {
        discard(&staging);
        EngineError::io(destination, e)
    })?;
    info!("Export completed");
    Ok(())
}

fn staging_path(destination: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(destination.file_name().unwrap_or_default());
    name.push(format!(".{}.export.tmp", std::process::id()));
    destination.with_file_name(name)
}

/// Remove a partially written export.
fn discard(staging: &Path) {
    let removed = match fs::symlink_metadata(staging) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(staging),
        Ok(_) => fs::remove_file(staging),
        Err(_) => Ok(()),
    };
    if let Err(e) = removed {
        warn!(path = %staging.display(), error = %e, "Failed to remove partial export");
    }
}

fn materialize(storage: &dyn Storage, file: &File, destination: &Path) -> Result<(), EngineError> {
    trace!(path = %destination.display(), kind = file.kind.name(), "Materializing");
    match &file.kind {
        FileKind::Regular { contents, mode } => {
            let bytes = object(storage, contents)?;
            write_file(destination, &bytes, *mode)
        }
        FileKind::Symlink { target } => {
            let target = object(storage, target)?;
            write_symlink(&target, destination)
        }
        FileKind::Directory { children } => {
            fs::create_dir(destination).map_err(|e| EngineError::io(destination, e))?;
            for (name, hash) in children {
                let child = storage.read_snapshot(hash)?;
                materialize(storage, &child, &destination.join(name))?;
            }
            Ok(())
        }
        FileKind::Conflict { ours, theirs, .. } => {
            let ours = ours.map(|h| storage.read_snapshot(&h)).transpose()?;
            let theirs = theirs.map(|h| storage.read_snapshot(&h)).transpose()?;
            match (&ours, &theirs) {
                (
                    Some(File {
                        kind: FileKind::Regular { contents: a, mode },
                        ..
                    }),
                    Some(File {
                        kind: FileKind::Regular { contents: b, .. },
                        ..
                    }),
                ) => {
                    let merged = conflict_markers(&object(storage, a)?, &object(storage, b)?);
                    write_file(destination, &merged, *mode)
                }
                _ => {
                    for (side, file) in [("ours", &ours), ("theirs", &theirs)] {
                        if let Some(file) = file {
                            materialize(storage, file, &with_suffix(destination, side))?;
                        }
                    }
                    Ok(())
                }
            }
        }
    }
}

fn object(storage: &dyn Storage, hash: &Hash) -> Result<Vec<u8>, EngineError> {
    Ok(storage
        .get_object(hash)?
        .ok_or(StorageError::ObjectNotFound(*hash))?)
}

/// Both sides of a conflicted file, delimited by conflict markers.
pub fn conflict_markers(ours: &[u8], theirs: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ours.len() + theirs.len() + 64);
    for (marker, side) in [(OURS_MARKER, ours), (SEPARATOR_MARKER, theirs)] {
        out.extend_from_slice(marker);
        out.extend_from_slice(side);
        if !side.is_empty() && !side.ends_with(b"\n") {
            out.push(b'\n');
        }
    }
    out.extend_from_slice(THEIRS_MARKER);
    out
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn write_file(destination: &Path, bytes: &[u8], mode: u32) -> Result<(), EngineError> {
    fs::write(destination, bytes).map_err(|e| EngineError::io(destination, e))?;
    set_mode(destination, mode)
}

#[cfg(unix)]
fn set_mode(destination: &Path, mode: u32) -> Result<(), EngineError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(destination, fs::Permissions::from_mode(mode))
        .map_err(|e| EngineError::io(destination, e))
}

#[cfg(not(unix))]
fn set_mode(_destination: &Path, _mode: u32) -> Result<(), EngineError> {
    Ok(())
}

#[cfg(unix)]
fn write_symlink(target: &[u8], destination: &Path) -> Result<(), EngineError> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    std::os::unix::fs::symlink(OsStr::from_bytes(target), destination)
        .map_err(|e| EngineError::io(destination, e))
}

#[cfg(not(unix))]
fn write_symlink(target: &[u8], destination: &Path) -> Result<(), EngineError> {
    use std::io;
    let target = std::str::from_utf8(target).map_err(|_| {
        EngineError::io(
            destination,
            io::Error::new(io::ErrorKind::InvalidData, "symlink target is not UTF-8"),
        )
    })?;
    fs::write(destination, target).map_err(|e| EngineError::io(destination, e))
}

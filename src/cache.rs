//! Change-detection cache
//!
//! Decides from cheap filesystem metadata whether a leaf is provably
//! unchanged since it was last hashed. A hit is only trusted when device,
//! inode, size, mode and modification time all match the recorded values;
//! anything less falls through to rehashing.
//!
//! Timestamps have limited granularity, so a file written in the same second
//! it was hashed could change again without its mtime moving. Metadata is
//! therefore only recorded once its mtime is strictly older than the start of
//! the current second, as reported by the injected [`Clock`]. Each entry names
//! the snapshot it was recorded for and is dropped whenever a newer snapshot
//! of the path could not be recorded.

use crate::error::StorageError;
use crate::store::Storage;
use crate::types::Hash;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

/// Kind of filesystem entry as observed by `lstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Regular,
    Directory,
    Symlink,
    Other,
}

/// Filesystem metadata observed when a path was hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathInfo {
    pub kind: EntryKind,
    pub size: u64,
    pub mode: u32,
    pub device: u64,
    pub inode: u64,
    pub mtime_secs: i64,
    pub mtime_nanos: u32,
}

impl PathInfo {
    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            kind: entry_kind(metadata),
            size: metadata.len(),
            mode: metadata.mode() & 0o7777,
            device: metadata.dev(),
            inode: metadata.ino(),
            mtime_secs: metadata.mtime(),
            mtime_nanos: metadata.mtime_nsec().clamp(0, 999_999_999) as u32,
        }
    }

    #[cfg(not(unix))]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let (mtime_secs, mtime_nanos) = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| (d.as_secs() as i64, d.subsec_nanos()))
            .unwrap_or((0, 0));
        Self {
            kind: entry_kind(metadata),
            size: metadata.len(),
            mode: if metadata.permissions().readonly() { 0o444 } else { 0o644 },
            device: 0,
            inode: 0,
            mtime_secs,
            mtime_nanos,
        }
    }

    /// Whether the entry has a stable identity that a cache hit can rely on.
    pub fn has_identity(&self) -> bool {
        self.inode != 0
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.mtime_secs, self.mtime_nanos).single()
    }

    /// Strict equality rule for trusting a cached hash.
    pub fn matches(&self, cached: &PathInfo) -> bool {
        self.has_identity() && self == cached
    }
}

fn entry_kind(metadata: &Metadata) -> EntryKind {
    let file_type = metadata.file_type();
    if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::Regular
    } else {
        EntryKind::Other
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a chosen instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Whether metadata is old enough that its mtime will move on any later write.
pub fn is_cacheable(info: &PathInfo, now: DateTime<Utc>) -> bool {
    let Some(modified) = info.modified() else {
        return false;
    };
    let second_start = Utc.timestamp_opt(now.timestamp(), 0).single().unwrap_or(now);
    info.has_identity() && modified < second_start
}

/// Policy deciding whether a leaf may skip rehashing.
pub trait ChangeDetector: Send + Sync {
    /// True only if `info` proves the content at `path` is unchanged.
    fn unchanged(&self, storage: &dyn Storage, path: &Path, info: &PathInfo) -> bool;

    /// Record `info` as the metadata `snapshot`, the latest node of `path`, was hashed with.
    fn record(
        &self,
        storage: &dyn Storage,
        path: &Path,
        info: &PathInfo,
        snapshot: &Hash,
    ) -> Result<(), StorageError>;
}

/// Trusts the storage's metadata cache under the strict match rule.
pub struct MetadataCache {
    clock: Arc<dyn Clock>,
}

impl MetadataCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl ChangeDetector for MetadataCache {
    fn unchanged(&self, storage: &dyn Storage, path: &Path, info: &PathInfo) -> bool {
        storage.path_info_matches_cache(path, info)
    }

    fn record(
        &self,
        storage: &dyn Storage,
        path: &Path,
        info: &PathInfo,
        snapshot: &Hash,
    ) -> Result<(), StorageError> {
        if is_cacheable(info, self.clock.now()) {
            storage.cache_path_info(path, info, snapshot)
        } else {
            // An older entry would vouch for a snapshot that is no longer latest.
            trace!(path = %path.display(), "Metadata too recent to cache");
            storage.forget_path_info(path)
        }
    }
}

/// Never trusts metadata; every leaf is rehashed.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysRehash;

impl ChangeDetector for AlwaysRehash {
    fn unchanged(&self, _storage: &dyn Storage, _path: &Path, _info: &PathInfo) -> bool {
        false
    }

    fn record(
        &self,
        _storage: &dyn Storage,
        _path: &Path,
        _info: &PathInfo,
        _snapshot: &Hash,
    ) -> Result<(), StorageError> {
        Ok(())
    }
}

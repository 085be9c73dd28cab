//! Snapshot storage
//!
//! The engine's only shared mutable resource: a write-once, content-addressed
//! object store, a path to latest-snapshot index, and the per-path metadata
//! cache. Implementations synchronize internally; callers may invoke any
//! operation concurrently from parallel snapshot workers.

pub mod memory;
pub mod persistence;

pub use memory::MemoryStorage;
pub use persistence::SledStorage;

use crate::cache::PathInfo;
use crate::error::{EngineError, StorageError};
use crate::snapshot::File;
use crate::types::Hash;
use std::io::Read;
use std::path::Path;

/// Storage interface consumed by the snapshot engine
///
/// Implementors provide the primitive operations; the snapshot-level
/// operations are provided on top of them so every backend encodes snapshots
/// identically.
pub trait Storage: Send + Sync {
    /// Persist `bytes` under `hash`. Storing an existing hash is a no-op.
    fn put_object(&self, hash: &Hash, bytes: &[u8]) -> Result<(), StorageError>;

    fn get_object(&self, hash: &Hash) -> Result<Option<Vec<u8>>, StorageError>;

    /// Latest snapshot hash recorded for `path`.
    fn latest(&self, path: &Path) -> Result<Option<Hash>, StorageError>;

    fn set_latest(&self, path: &Path, hash: &Hash) -> Result<(), StorageError>;

    /// Record `info` as the metadata `snapshot` was hashed with.
    fn cache_path_info(
        &self,
        path: &Path,
        info: &PathInfo,
        snapshot: &Hash,
    ) -> Result<(), StorageError>;

    fn cached_path_info(&self, path: &Path) -> Result<Option<(PathInfo, Hash)>, StorageError>;

    /// Drop the cached metadata for `path`, forcing the next snapshot to rehash it.
    fn forget_path_info(&self, path: &Path) -> Result<(), StorageError>;

    /// Policy hook: excluded paths are never read, hashed or recorded.
    fn exclude(&self, path: &Path) -> bool;

    /// Persist the bytes of `reader`, returning their hash.
    fn store_object(&self, reader: &mut dyn Read) -> Result<Hash, StorageError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let hash = Hash::of(&bytes);
        self.put_object(&hash, &bytes)?;
        Ok(hash)
    }

    /// Persist a snapshot node without touching the path index.
    fn store_file(&self, file: &File) -> Result<Hash, StorageError> {
        let text = file.serialize();
        let hash = Hash::of(text.as_bytes());
        self.put_object(&hash, text.as_bytes())?;
        Ok(hash)
    }

    /// Persist a snapshot node and advance the index for `path` to it.
    ///
    /// The index moves only after the object write succeeded.
    fn store_snapshot(&self, path: &Path, file: &File) -> Result<Hash, StorageError> {
        let hash = self.store_file(file)?;
        self.set_latest(path, &hash)?;
        Ok(hash)
    }

    /// Read and decode the snapshot node stored under `hash`.
    fn read_snapshot(&self, hash: &Hash) -> Result<File, EngineError> {
        let bytes = self
            .get_object(hash)?
            .ok_or(StorageError::ObjectNotFound(*hash))?;
        let text = std::str::from_utf8(&bytes).map_err(|_| crate::error::FormatError::NotUtf8)?;
        Ok(File::parse(text)?)
    }

    /// Latest snapshot for `path`, if it was ever snapshotted.
    fn find_snapshot(&self, path: &Path) -> Result<Option<(Hash, File)>, EngineError> {
        match self.latest(path)? {
            Some(hash) => Ok(Some((hash, self.read_snapshot(&hash)?))),
            None => Ok(None),
        }
    }

    /// True only if `info` matches the cached metadata under the strict rule
    /// and the entry was recorded for the path's latest snapshot.
    fn path_info_matches_cache(&self, path: &Path, info: &PathInfo) -> bool {
        match (self.cached_path_info(path), self.latest(path)) {
            (Ok(Some((cached, snapshot))), Ok(Some(latest))) => {
                snapshot == latest && info.matches(&cached)
            }
            _ => false,
        }
    }
}

//! Sled-backed snapshot storage

use crate::cache::PathInfo;
use crate::error::StorageError;
use crate::ignore::ExcludeRules;
use crate::store::Storage;
use crate::tree::path::path_key;
use crate::types::Hash;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

const OBJECTS_TREE: &str = "objects";
const PATHS_TREE: &str = "paths";
const PATH_INFO_TREE: &str = "path_info";

/// Value stored in the `path_info` tree.
#[derive(Serialize, Deserialize)]
struct PathInfoRecord {
    info: PathInfo,
    snapshot: [u8; 32],
}

/// Sled-based implementation of [`Storage`]
///
/// Objects, the path index and the metadata cache live in separate sled
/// trees of one database. Sled handles concurrent access internally.
pub struct SledStorage {
    db: sled::Db,
    objects: sled::Tree,
    paths: sled::Tree,
    path_info: sled::Tree,
    exclude: ExcludeRules,
}

impl SledStorage {
    /// Open (creating if needed) the database in the directory `path`.
    ///
    /// The database directory itself is always excluded from snapshots.
    pub fn open<P: AsRef<Path>>(path: P, exclude: ExcludeRules) -> Result<Self, StorageError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let db = sled::open(path)?;
        let root = dunce::canonicalize(path)?;
        debug!(store = %root.display(), "Opened snapshot store");
        Self::from_db(db, exclude.with_excluded_root(root))
    }

    /// Wrap an already opened database.
    pub fn from_db(db: sled::Db, exclude: ExcludeRules) -> Result<Self, StorageError> {
        Ok(Self {
            objects: db.open_tree(OBJECTS_TREE)?,
            paths: db.open_tree(PATHS_TREE)?,
            path_info: db.open_tree(PATH_INFO_TREE)?,
            db,
            exclude,
        })
    }

    pub fn contains(&self, hash: &Hash) -> Result<bool, StorageError> {
        Ok(self.objects.contains_key(hash.as_bytes())?)
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl Storage for SledStorage {
    fn put_object(&self, hash: &Hash, bytes: &[u8]) -> Result<(), StorageError> {
        // Write-once: an existing entry is never replaced.
        let _ = self
            .objects
            .compare_and_swap(hash.as_bytes(), None as Option<&[u8]>, Some(bytes))?;
        Ok(())
    }

    fn get_object(&self, hash: &Hash) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.objects.get(hash.as_bytes())?.map(|v| v.to_vec()))
    }

    fn latest(&self, path: &Path) -> Result<Option<Hash>, StorageError> {
        match self.paths.get(path_key(path))? {
            Some(value) => {
                let bytes: [u8; 32] = value.as_ref().try_into().map_err(|_| {
                    StorageError::Codec(format!(
                        "Path index entry for {} is {} bytes",
                        path.display(),
                        value.len()
                    ))
                })?;
                Ok(Some(Hash::from_bytes(bytes)))
            }
            None => Ok(None),
        }
    }

    fn set_latest(&self, path: &Path, hash: &Hash) -> Result<(), StorageError> {
        self.paths
            .insert(path_key(path), hash.as_bytes().as_slice())?;
        Ok(())
    }

    fn cache_path_info(
        &self,
        path: &Path,
        info: &PathInfo,
        snapshot: &Hash,
    ) -> Result<(), StorageError> {
        let record = PathInfoRecord {
            info: info.clone(),
            snapshot: *snapshot.as_bytes(),
        };
        let value = bincode::serialize(&record)
            .map_err(|e| StorageError::Codec(format!("Failed to serialize path info: {}", e)))?;
        self.path_info.insert(path_key(path), value)?;
        Ok(())
    }

    fn cached_path_info(&self, path: &Path) -> Result<Option<(PathInfo, Hash)>, StorageError> {
        match self.path_info.get(path_key(path))? {
            Some(value) => {
                let record: PathInfoRecord = bincode::deserialize(&value).map_err(|e| {
                    StorageError::Codec(format!("Failed to deserialize path info: {}", e))
                })?;
                Ok(Some((record.info, Hash::from_bytes(record.snapshot))))
            }
            None => Ok(None),
        }
    }

    fn forget_path_info(&self, path: &Path) -> Result<(), StorageError> {
        self.path_info.remove(path_key(path))?;
        Ok(())
    }

    fn exclude(&self, path: &Path) -> bool {
        self.exclude.is_excluded(path)
    }
}

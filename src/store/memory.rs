//! In-memory storage, used for tests and embedding.

use crate::cache::PathInfo;
use crate::error::StorageError;
use crate::ignore::ExcludeRules;
use crate::store::Storage;
use crate::tree::path::path_key;
use crate::types::Hash;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;

#[derive(Default)]
struct Tables {
    objects: HashMap<Hash, Vec<u8>>,
    paths: HashMap<Vec<u8>, Hash>,
    path_info: HashMap<Vec<u8>, (PathInfo, Hash)>,
}

/// Storage backed by mutex-guarded hash maps
#[derive(Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
    exclude: ExcludeRules,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exclude(exclude: ExcludeRules) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            exclude,
        }
    }

    pub fn object_count(&self) -> usize {
        self.tables.lock().objects.len()
    }
}

impl Storage for MemoryStorage {
    fn put_object(&self, hash: &Hash, bytes: &[u8]) -> Result<(), StorageError> {
        self.tables
            .lock()
            .objects
            .entry(*hash)
            .or_insert_with(|| bytes.to_vec());
        Ok(())
    }

    fn get_object(&self, hash: &Hash) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.tables.lock().objects.get(hash).cloned())
    }

    fn latest(&self, path: &Path) -> Result<Option<Hash>, StorageError> {
        Ok(self.tables.lock().paths.get(&path_key(path)).copied())
    }

    fn set_latest(&self, path: &Path, hash: &Hash) -> Result<(), StorageError> {
        self.tables.lock().paths.insert(path_key(path), *hash);
        Ok(())
    }

    fn cache_path_info(
        &self,
        path: &Path,
        info: &PathInfo,
        snapshot: &Hash,
    ) -> Result<(), StorageError> {
        self.tables
            .lock()
            .path_info
            .insert(path_key(path), (info.clone(), *snapshot));
        Ok(())
    }

    fn cached_path_info(&self, path: &Path) -> Result<Option<(PathInfo, Hash)>, StorageError> {
        Ok(self.tables.lock().path_info.get(&path_key(path)).cloned())
    }

    fn forget_path_info(&self, path: &Path) -> Result<(), StorageError> {
        self.tables.lock().path_info.remove(&path_key(path));
        Ok(())
    }

    fn exclude(&self, path: &Path) -> bool {
        self.exclude.is_excluded(path)
    }
}

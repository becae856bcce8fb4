use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use crate::error::{CacheError, CacheResult};
use crate::fingerprint::Fingerprint;
use crate::store::PersistentCache;

/// A cache that stores one JSON file per fingerprint under a root directory.
pub struct FileSystemCache {
    root: PathBuf,
}

impl FileSystemCache {
    pub fn new(root: impl Into<PathBuf>) -> CacheResult<Self> {
        let root = root.into();
        if root.exists() {
            if !root.is_dir() {
                return Err(CacheError::Storage(format!(
                    "cache path {} exists and is not a directory",
                    root.display()
                )));
            }
        } else {
            fs::create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(format!("{fingerprint}.json"))
    }
}

impl PersistentCache for FileSystemCache {
    fn describe(&self) -> String {
        format!("filesystem at {}", self.root.display())
    }

    fn contains(&self, fingerprint: &Fingerprint) -> CacheResult<bool> {
        Ok(self.entry_path(fingerprint).is_file())
    }

    fn get(&self, fingerprint: &Fingerprint) -> CacheResult<Option<Value>> {
        let path = self.entry_path(fingerprint);
        if !path.is_file() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn put(&self, fingerprint: &Fingerprint, value: Value) -> CacheResult<()> {
        let path = self.entry_path(fingerprint);
        let staged = path.with_extension("json.tmp");
        fs::write(&staged, serde_json::to_string(&value)?)?;
        // Rename so that concurrent readers never observe a partial entry.
        fs::rename(&staged, &path)?;
        Ok(())
    }
}

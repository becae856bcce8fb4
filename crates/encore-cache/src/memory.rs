use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::error::CacheResult;
use crate::fingerprint::Fingerprint;
use crate::store::PersistentCache;

/// An in-memory cache. Cloned handles share the same underlying map, so a
/// single instance can serve a driver and its in-process workers.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<Fingerprint, Value>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Fingerprint, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PersistentCache for MemoryCache {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn contains(&self, fingerprint: &Fingerprint) -> CacheResult<bool> {
        Ok(self.entries().contains_key(fingerprint))
    }

    fn get(&self, fingerprint: &Fingerprint) -> CacheResult<Option<Value>> {
        Ok(self.entries().get(fingerprint).cloned())
    }

    fn put(&self, fingerprint: &Fingerprint, value: Value) -> CacheResult<()> {
        self.entries().insert(*fingerprint, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CacheExt;

    #[test]
    fn test_memory_cache_round_trip() {
        let cache = MemoryCache::new();
        let fingerprint = Fingerprint::of("math.add", &(1, 2)).unwrap();
        assert!(!cache.contains(&fingerprint).unwrap());
        assert!(cache.get(&fingerprint).unwrap().is_none());

        cache.put_value(&fingerprint, &3_i64).unwrap();
        assert!(cache.contains(&fingerprint).unwrap());
        assert_eq!(cache.get_value::<i64>(&fingerprint).unwrap(), Some(3));
    }

    #[test]
    fn test_cloned_handles_share_entries() {
        let cache = MemoryCache::new();
        let other = cache.clone();
        let fingerprint = Fingerprint::of("math.add", &(1, 2)).unwrap();
        cache.put_value(&fingerprint, &3_i64).unwrap();
        assert!(other.contains(&fingerprint).unwrap());
        assert_eq!(other.len(), 1);
    }
}

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::CacheResult;
use crate::fingerprint::Fingerprint;

pub type CacheRef = Arc<dyn PersistentCache>;

/// A persistent store of computation results keyed by call fingerprint.
///
/// Implementations own their storage medium and their concurrency discipline.
/// A value written through any handle to the store must be visible to every
/// later query through the same store.
pub trait PersistentCache: Send + Sync + 'static {
    /// A short label for log messages.
    fn describe(&self) -> String;

    fn contains(&self, fingerprint: &Fingerprint) -> CacheResult<bool>;

    fn get(&self, fingerprint: &Fingerprint) -> CacheResult<Option<Value>>;

    fn put(&self, fingerprint: &Fingerprint, value: Value) -> CacheResult<()>;
}

/// Typed access over the JSON value surface of [`PersistentCache`].
pub trait CacheExt {
    fn get_value<T: DeserializeOwned>(&self, fingerprint: &Fingerprint) -> CacheResult<Option<T>>;

    fn put_value<T: Serialize>(&self, fingerprint: &Fingerprint, value: &T) -> CacheResult<()>;
}

impl<S: PersistentCache + ?Sized> CacheExt for S {
    fn get_value<T: DeserializeOwned>(&self, fingerprint: &Fingerprint) -> CacheResult<Option<T>> {
        let Some(value) = self.get(fingerprint)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(value)?))
    }

    fn put_value<T: Serialize>(&self, fingerprint: &Fingerprint, value: &T) -> CacheResult<()> {
        self.put(fingerprint, serde_json::to_value(value)?)
    }
}

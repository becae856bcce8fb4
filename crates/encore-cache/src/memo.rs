use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CacheResult;
use crate::fingerprint::Fingerprint;
use crate::scope::current_cache;
use crate::store::CacheExt;

/// A computation that can be memoized by a persistent cache.
#[async_trait]
pub trait Computation: Send + Sync + 'static {
    type Args: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;
    type Output: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// The stable name of the computation. The name must resolve to the same
    /// computation wherever it runs; it is half of the cache identity of
    /// every call.
    fn name(&self) -> &str;

    async fn compute(&self, args: Self::Args) -> CacheResult<Self::Output>;
}

/// Write-through memoization for a [`Computation`].
///
/// With a cache current, a call is answered from the cache when possible,
/// and the computed value is persisted otherwise. With no cache current,
/// calls pass straight through.
pub struct Memoized<C> {
    inner: C,
}

impl<C> Memoized<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: Computation> Computation for Memoized<C> {
    type Args = C::Args;
    type Output = C::Output;

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn compute(&self, args: Self::Args) -> CacheResult<Self::Output> {
        let Some(cache) = current_cache() else {
            return self.inner.compute(args).await;
        };
        let fingerprint = Fingerprint::of(self.name(), &args)?;
        if let Some(value) = cache.get_value(&fingerprint)? {
            debug!("cache hit for {} call {fingerprint}", self.name());
            return Ok(value);
        }
        let value = self.inner.compute(args).await?;
        cache.put_value(&fingerprint, &value)?;
        Ok(value)
    }
}

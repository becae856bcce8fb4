use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::store::CacheRef;

static CURRENT: Mutex<Option<CacheRef>> = Mutex::new(None);

// Serializes tests that observe or mutate the process-wide slot.
#[cfg(test)]
pub(crate) static SCOPE_TEST_LOCK: Mutex<()> = Mutex::new(());

tokio::task_local! {
    static TASK_CACHE: CacheRef;
}

/// Make `store` the current cache for the whole process.
/// The previous store is restored when the returned scope is dropped.
pub fn caching_into(store: CacheRef) -> CacheScope {
    debug!("caching into {}", store.describe());
    let previous = current().replace(store);
    CacheScope { previous }
}

/// Resolve the cache visible to the calling task: a task-scoped override
/// if one is active, otherwise the process-wide store.
pub fn current_cache() -> Option<CacheRef> {
    if let Ok(store) = TASK_CACHE.try_with(|store| store.clone()) {
        return Some(store);
    }
    current().clone()
}

/// Run `future` with `store` as a task-scoped cache override.
///
/// Backend workers wrap batch execution in this so that results are
/// persisted to the store that was submitted with the batch, regardless of
/// the process-wide scope.
pub async fn with_cache<F: Future>(store: CacheRef, future: F) -> F::Output {
    TASK_CACHE.scope(store, future).await
}

pub struct CacheScope {
    previous: Option<CacheRef>,
}

impl Drop for CacheScope {
    fn drop(&mut self) {
        *current() = self.previous.take();
    }
}

fn current() -> MutexGuard<'static, Option<CacheRef>> {
    CURRENT.lock().unwrap_or_else(PoisonError::into_inner)
}

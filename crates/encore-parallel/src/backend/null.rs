use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use encore_cache::{with_cache, CacheRef};
use log::debug;

use crate::backend::ParallelBackend;
use crate::batch::Batch;
use crate::error::{ParallelError, ParallelResult};
use crate::id::{JobId, JobIdGenerator};
use crate::registry::FunctionRegistry;

/// A backend that executes each batch synchronously inside `submit`.
/// Useful for debugging and for environments without worker capacity.
pub struct NullBackend {
    id_generator: Mutex<JobIdGenerator>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            id_generator: Mutex::new(JobIdGenerator::new()),
        }
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParallelBackend for NullBackend {
    async fn submit(&self, cache: CacheRef, batch: Batch) -> ParallelResult<JobId> {
        let job_id = self
            .id_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next()?;
        debug!(
            "job {job_id} is executing batch {} of {} synchronously",
            batch.key, batch.function
        );
        let runner = FunctionRegistry::global().resolve(&batch.function)?;
        with_cache(cache, runner.run(batch.calls))
            .await
            .map_err(|e| ParallelError::Backend(format!("job {job_id} failed: {e}")))?;
        Ok(job_id)
    }

    async fn prune(&self, _jobs: Vec<JobId>) -> ParallelResult<Vec<JobId>> {
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use encore_cache::{CacheExt, CacheResult, Computation, Fingerprint, MemoryCache, Memoized};
    use serde_json::json;

    use super::*;
    use crate::batch::BatchKey;
    use crate::function::Parallelized;

    struct Add;

    #[async_trait]
    impl Computation for Add {
        type Args = (i64, i64);
        type Output = i64;

        fn name(&self) -> &str {
            "tests.null.add"
        }

        async fn compute(&self, (a, b): (i64, i64)) -> CacheResult<i64> {
            Ok(a + b)
        }
    }

    #[tokio::test]
    async fn test_batches_complete_within_submit() {
        let _function = Parallelized::new(Memoized::new(Add), |_| 0, |&(a, _)| a);
        let cache = MemoryCache::new();
        let backend = NullBackend::new();
        let batch = Batch {
            function: "tests.null.add".to_string(),
            key: BatchKey::compute(&1).unwrap(),
            calls: vec![json!([1, 2])],
        };

        let job = backend.submit(Arc::new(cache.clone()), batch).await.unwrap();
        assert!(backend.prune(vec![job]).await.unwrap().is_empty());

        let fingerprint = Fingerprint::of("tests.null.add", &(1, 2)).unwrap();
        assert_eq!(cache.get_value::<i64>(&fingerprint).unwrap(), Some(3));
    }
}

mod null;
mod pool;

pub use null::NullBackend;
pub use pool::{PoolBackend, PoolOptions};

use async_trait::async_trait;
use encore_cache::CacheRef;

use crate::batch::Batch;
use crate::error::ParallelResult;
use crate::id::JobId;

/// A parallelization backend.
///
/// Backends execute batches asynchronously; their only observable outcome
/// is the population of the submitted cache. On the worker side a backend
/// must resolve the batch function by its stable name, invoke its batcher
/// with the ordered calls, and persist the results to the cache referenced
/// by the submitted handle before the job is reported complete.
///
/// Backends are reusable: they may receive batches from any number of
/// consecutive driver runs.
#[async_trait]
pub trait ParallelBackend: Send + Sync + 'static {
    /// Accept a single batch for asynchronous execution.
    async fn submit(&self, cache: CacheRef, batch: Batch) -> ParallelResult<JobId>;

    /// Return the subset of the given jobs that are still incomplete.
    /// A failed job surfaces here as an error and aborts the run.
    async fn prune(&self, jobs: Vec<JobId>) -> ParallelResult<Vec<JobId>>;
}

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use encore_cache::{with_cache, CacheRef};
use futures::FutureExt;
use log::debug;
use tokio::sync::Semaphore;

use crate::backend::ParallelBackend;
use crate::batch::Batch;
use crate::error::{ParallelError, ParallelResult};
use crate::id::{JobId, JobIdGenerator};
use crate::registry::FunctionRegistry;

#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// The number of batches the pool executes concurrently.
    pub workers: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|parallelism| parallelism.get())
                .unwrap_or(1),
        }
    }
}

enum JobStatus {
    Running,
    Succeeded,
    Failed(String),
}

/// The reference backend: a fixed-size in-process worker pool.
///
/// Each submitted batch becomes a task that resolves the function from the
/// registry and executes its batcher under the submitted cache handle. A
/// panicking batch is recorded as a failed job rather than poisoning the
/// pool.
pub struct PoolBackend {
    semaphore: Arc<Semaphore>,
    jobs: Arc<Mutex<HashMap<JobId, JobStatus>>>,
    id_generator: Mutex<JobIdGenerator>,
}

impl PoolBackend {
    pub fn new(options: PoolOptions) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(options.workers.max(1))),
            jobs: Arc::new(Mutex::new(HashMap::new())),
            id_generator: Mutex::new(JobIdGenerator::new()),
        }
    }

    fn next_job_id(&self) -> ParallelResult<JobId> {
        self.id_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next()
    }
}

impl Default for PoolBackend {
    fn default() -> Self {
        Self::new(PoolOptions::default())
    }
}

fn lock_jobs(
    jobs: &Mutex<HashMap<JobId, JobStatus>>,
) -> MutexGuard<'_, HashMap<JobId, JobStatus>> {
    jobs.lock().unwrap_or_else(PoisonError::into_inner)
}

// A job with no table entry has been abandoned by a failed run; its late
// result is dropped rather than re-inserted.
fn update_job(jobs: &Mutex<HashMap<JobId, JobStatus>>, job_id: JobId, status: JobStatus) {
    if let Some(entry) = lock_jobs(jobs).get_mut(&job_id) {
        *entry = status;
    }
}

async fn run_batch(cache: CacheRef, batch: Batch) -> ParallelResult<()> {
    let runner = FunctionRegistry::global().resolve(&batch.function)?;
    with_cache(cache, runner.run(batch.calls)).await
}

#[async_trait]
impl ParallelBackend for PoolBackend {
    async fn submit(&self, cache: CacheRef, batch: Batch) -> ParallelResult<JobId> {
        let job_id = self.next_job_id()?;
        lock_jobs(&self.jobs).insert(job_id, JobStatus::Running);

        let semaphore = self.semaphore.clone();
        let jobs = self.jobs.clone();
        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    update_job(&jobs, job_id, JobStatus::Failed("the worker pool is closed".to_string()));
                    return;
                }
            };
            debug!("job {job_id} is executing batch {} of {}", batch.key, batch.function);
            let status = match AssertUnwindSafe(run_batch(cache, batch)).catch_unwind().await {
                Ok(Ok(())) => JobStatus::Succeeded,
                Ok(Err(e)) => JobStatus::Failed(e.to_string()),
                Err(_) => JobStatus::Failed("the batch execution panicked".to_string()),
            };
            update_job(&jobs, job_id, status);
        });
        Ok(job_id)
    }

    async fn prune(&self, jobs: Vec<JobId>) -> ParallelResult<Vec<JobId>> {
        let mut tracked = lock_jobs(&self.jobs);
        let mut incomplete = vec![];
        let mut failure = None;
        for &job_id in &jobs {
            if matches!(tracked.get(&job_id), Some(JobStatus::Running)) {
                incomplete.push(job_id);
                continue;
            }
            if let Some(JobStatus::Failed(message)) = tracked.remove(&job_id) {
                failure.get_or_insert((job_id, message));
            }
        }
        if let Some((job_id, message)) = failure {
            // The driver stops polling once a failure surfaces, so untrack
            // the jobs it abandons along with the failed one.
            for abandoned in incomplete {
                tracked.remove(&abandoned);
            }
            return Err(ParallelError::Backend(format!(
                "job {job_id} failed: {message}"
            )));
        }
        Ok(incomplete)
    }
}

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use encore_cache::{current_cache, CacheRef};
use log::{debug, info};
use tokio::time::sleep;

use crate::backend::ParallelBackend;
use crate::batch::{Batch, CallRecord};
use crate::driver::options::DriverOptions;
use crate::driver::state::{DriverMode, DriverState};
use crate::error::{ParallelError, ParallelResult};

// The process-wide active-driver slot. Wrappers discover the driver mode
// through this slot without threading a context through every call site.
static ACTIVE_DRIVER: Mutex<Option<Arc<DriverCore>>> = Mutex::new(None);

pub(crate) fn active_driver() -> Option<Arc<DriverCore>> {
    slot().clone()
}

fn slot() -> MutexGuard<'static, Option<Arc<DriverCore>>> {
    ACTIVE_DRIVER.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct DriverCore {
    state: Mutex<DriverState>,
}

impl DriverCore {
    fn new() -> Self {
        Self {
            state: Mutex::new(DriverState::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, DriverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn mode(&self) -> DriverMode {
        self.state().mode()
    }

    pub(crate) fn cache(&self) -> ParallelResult<CacheRef> {
        self.state().cache().ok_or_else(|| {
            ParallelError::Configuration("no persistent cache is active for the driver".to_string())
        })
    }

    pub(crate) fn record(&self, record: CallRecord) {
        self.state().record(record);
    }
}

/// An environment in which parallelizable calls are captured, dispatched to
/// a backend in batches, and then replayed from the persistent cache.
pub struct ParallelEnvironment {
    core: Arc<DriverCore>,
    backend: Arc<dyn ParallelBackend>,
    options: DriverOptions,
}

impl ParallelEnvironment {
    pub fn new(backend: Arc<dyn ParallelBackend>) -> Self {
        Self::with_options(backend, DriverOptions::default())
    }

    pub fn with_options(backend: Arc<dyn ParallelBackend>, options: DriverOptions) -> Self {
        Self {
            core: Arc::new(DriverCore::new()),
            backend,
            options,
        }
    }

    /// Acquire the process-wide active-driver slot for this environment.
    ///
    /// At most one scope is active per process at any time; nested scopes
    /// are rejected. The slot is released when the returned scope is
    /// dropped, on every exit path.
    pub fn enter(&self) -> ParallelResult<DriverScope<'_>> {
        if self.core.mode() == DriverMode::Done {
            return Err(ParallelError::Configuration(
                "the parallel environment has already completed".to_string(),
            ));
        }
        let mut slot = slot();
        if slot.is_some() {
            return Err(ParallelError::Configuration(
                "another parallel environment is already active".to_string(),
            ));
        }
        *slot = Some(self.core.clone());
        Ok(DriverScope { environment: self })
    }
}

/// A scoped acquisition of the active-driver slot, driving the two-run
/// protocol:
///
/// ```ignore
/// let environment = ParallelEnvironment::new(backend);
/// let mut scope = environment.enter()?;
/// while scope.run().await? {
///     // The body runs once capturing and once replaying. It must issue
///     // the same parallelizable calls with the same arguments both times.
///     let value = computation.call(args).await?;
/// }
/// ```
pub struct DriverScope<'a> {
    environment: &'a ParallelEnvironment,
}

impl DriverScope<'_> {
    /// True while the scope is capturing parallelizable calls.
    pub fn capturing(&self) -> bool {
        self.environment.core.mode() == DriverMode::Capturing
    }

    /// Advance the driver. Returns true when the user body should run
    /// again: once for the capture run and once for the replay run. The
    /// replay run is skipped when every captured call was already cached.
    pub async fn run(&mut self) -> ParallelResult<bool> {
        let core = &self.environment.core;
        match core.mode() {
            DriverMode::Idle => self.capture(),
            DriverMode::Capturing => self.compute().await,
            DriverMode::Replaying => {
                core.state().finish();
                Ok(false)
            }
            DriverMode::Done => Ok(false),
            DriverMode::Computing => Err(ParallelError::Internal(
                "the driver cannot be run while computing".to_string(),
            )),
        }
    }

    fn capture(&self) -> ParallelResult<bool> {
        let core = &self.environment.core;
        let Some(cache) = current_cache() else {
            core.state().finish();
            return Err(ParallelError::Configuration(
                "no persistent cache is active; enter a caching_into scope first".to_string(),
            ));
        };
        info!("capturing parallelizable calls into {}", cache.describe());
        core.state().begin_capture(cache);
        Ok(true)
    }

    async fn compute(&self) -> ParallelResult<bool> {
        let core = &self.environment.core;
        let cache = core.cache();
        let batches = core.state().begin_compute();
        if batches.is_empty() {
            info!("every captured call was already cached; skipping the replay run");
            core.state().finish();
            return Ok(false);
        }
        let result = match cache {
            Ok(cache) => self.dispatch(cache, batches).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                core.state().begin_replay();
                info!("replaying captured calls from the cache");
                Ok(true)
            }
            Err(e) => {
                core.state().finish();
                Err(e)
            }
        }
    }

    async fn dispatch(&self, cache: CacheRef, batches: Vec<Batch>) -> ParallelResult<()> {
        info!("submitting {} batches to the backend", batches.len());
        let mut jobs = Vec::with_capacity(batches.len());
        for batch in batches {
            debug!(
                "submitting batch {} of {} with {} calls",
                batch.key,
                batch.function,
                batch.calls.len()
            );
            jobs.push(self.environment.backend.submit(cache.clone(), batch).await?);
        }
        loop {
            jobs = self.environment.backend.prune(jobs).await?;
            if jobs.is_empty() {
                break;
            }
            debug!("{} jobs are still incomplete", jobs.len());
            sleep(self.environment.options.poll_interval).await;
        }
        info!("all batches have completed");
        Ok(())
    }
}

impl Drop for DriverScope<'_> {
    fn drop(&mut self) {
        self.environment.core.state().finish();
        *slot() = None;
    }
}

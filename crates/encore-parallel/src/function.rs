use std::sync::Arc;

use async_trait::async_trait;
use encore_cache::{CacheExt, Computation, Fingerprint};
use log::warn;
use serde::Serialize;
use serde_json::Value;

use crate::batch::{BatchKey, CallRecord};
use crate::driver::{active_driver, DriverCore, DriverMode};
use crate::error::{ParallelError, ParallelResult};
use crate::registry::{BatchRunner, FunctionRegistry};

type PlaceholderFn<C> =
    Box<dyn Fn(&<C as Computation>::Args) -> <C as Computation>::Output + Send + Sync>;
type BatchKeyFn<C> = Box<dyn Fn(&<C as Computation>::Args) -> ParallelResult<BatchKey> + Send + Sync>;

/// Executes one batch of calls sharing a batch key.
///
/// The calls appear in arrival order. Results are not returned; they must
/// be persisted through the current cache for the replay run to observe
/// them, which happens naturally when the function is memoized.
#[async_trait]
pub trait Batcher<C: Computation>: Send + Sync {
    async fn run(&self, func: &C, calls: Vec<C::Args>) -> ParallelResult<()>;
}

/// Runs each call of a batch sequentially. Correct for any function;
/// custom batchers exist to amortize shared setup across a batch.
pub struct DefaultBatcher;

#[async_trait]
impl<C: Computation> Batcher<C> for DefaultBatcher {
    async fn run(&self, func: &C, calls: Vec<C::Args>) -> ParallelResult<()> {
        for args in calls {
            func.compute(args).await?;
        }
        Ok(())
    }
}

/// A parallelizable decoration over a computation.
///
/// Outside a driver scope the wrapper is transparent. Inside a scope its
/// behavior follows the driver mode: during the capture run, uncached calls
/// are recorded for batch dispatch and answered with placeholders; during
/// the replay run, calls go to the underlying computation and hit the
/// cache populated by the parallel phase.
pub struct Parallelized<C: Computation> {
    inner: Arc<ParallelizedInner<C>>,
}

impl<C: Computation> Clone for Parallelized<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct ParallelizedInner<C: Computation> {
    func: C,
    placeholder: PlaceholderFn<C>,
    batch_key: BatchKeyFn<C>,
    batcher: Box<dyn Batcher<C>>,
}

impl<C: Computation> Parallelized<C> {
    /// Decorate `func` with the default per-call batcher.
    ///
    /// The underlying computation must be persistently memoized (see
    /// [`encore_cache::Memoized`]) or the results of the parallel phase
    /// will be lost. The placeholder factory must return a value that the
    /// code downstream of the call can operate on without crashing.
    pub fn new<P, K, Q>(func: C, placeholder: P, batch_key: K) -> Self
    where
        P: Fn(&C::Args) -> C::Output + Send + Sync + 'static,
        K: Fn(&C::Args) -> Q + Send + Sync + 'static,
        Q: Serialize,
    {
        Self::with_batcher(func, placeholder, batch_key, DefaultBatcher)
    }

    /// Decorate `func` with a custom batcher.
    pub fn with_batcher<P, K, Q, B>(func: C, placeholder: P, batch_key: K, batcher: B) -> Self
    where
        P: Fn(&C::Args) -> C::Output + Send + Sync + 'static,
        K: Fn(&C::Args) -> Q + Send + Sync + 'static,
        Q: Serialize,
        B: Batcher<C> + 'static,
    {
        let inner = Arc::new(ParallelizedInner {
            func,
            placeholder: Box::new(placeholder),
            batch_key: Box::new(move |args| BatchKey::compute(&batch_key(args))),
            batcher: Box::new(batcher),
        });
        FunctionRegistry::global().register(inner.clone());
        Self { inner }
    }

    pub fn name(&self) -> &str {
        self.inner.func.name()
    }

    pub async fn call(&self, args: C::Args) -> ParallelResult<C::Output> {
        let Some(driver) = active_driver() else {
            return self.invoke(args).await;
        };
        match driver.mode() {
            DriverMode::Capturing => self.capture(&driver, args),
            DriverMode::Replaying => self.replay(&driver, args).await,
            DriverMode::Computing => {
                warn!("{} was called while the driver was computing", self.name());
                self.invoke(args).await
            }
            DriverMode::Idle | DriverMode::Done => self.invoke(args).await,
        }
    }

    async fn invoke(&self, args: C::Args) -> ParallelResult<C::Output> {
        Ok(self.inner.func.compute(args).await?)
    }

    fn serialize_arguments(&self, args: &C::Args) -> ParallelResult<Value> {
        serde_json::to_value(args).map_err(|e| {
            ParallelError::Contract(format!(
                "the arguments of {} are not serializable: {e}",
                self.name()
            ))
        })
    }

    fn capture(&self, driver: &DriverCore, args: C::Args) -> ParallelResult<C::Output> {
        let cache = driver.cache()?;
        let arguments = self.serialize_arguments(&args)?;
        let fingerprint = Fingerprint::of_value(self.name(), &arguments);
        if let Some(value) = cache.get_value(&fingerprint)? {
            return Ok(value);
        }
        let key = (self.inner.batch_key)(&args)?;
        driver.record(CallRecord {
            function: self.name().to_string(),
            key,
            arguments,
        });
        Ok((self.inner.placeholder)(&args))
    }

    async fn replay(&self, driver: &DriverCore, args: C::Args) -> ParallelResult<C::Output> {
        let cache = driver.cache()?;
        let arguments = self.serialize_arguments(&args)?;
        let fingerprint = Fingerprint::of_value(self.name(), &arguments);
        if !cache.contains(&fingerprint)? {
            return Err(ParallelError::CaptureDeterminism(format!(
                "{} call {fingerprint} was not issued during the capture run",
                self.name()
            )));
        }
        self.invoke(args).await
    }
}

#[async_trait]
impl<C: Computation> BatchRunner for ParallelizedInner<C> {
    fn name(&self) -> &str {
        self.func.name()
    }

    async fn run(&self, calls: Vec<Value>) -> ParallelResult<()> {
        let calls = calls
            .into_iter()
            .map(|arguments| {
                serde_json::from_value(arguments).map_err(|e| {
                    ParallelError::Contract(format!(
                        "the arguments of {} cannot be decoded: {e}",
                        self.func.name()
                    ))
                })
            })
            .collect::<ParallelResult<Vec<C::Args>>>()?;
        self.batcher.run(&self.func, calls).await
    }
}

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use log::warn;
use serde_json::Value;

use crate::error::{ParallelError, ParallelResult};

static REGISTRY: LazyLock<FunctionRegistry> = LazyLock::new(FunctionRegistry::new);

/// The worker-side surface of a parallelizable function: decode the erased
/// call arguments and run them through the function's batcher.
#[async_trait]
pub trait BatchRunner: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn run(&self, calls: Vec<Value>) -> ParallelResult<()>;
}

/// The process-wide map from stable function names to batch runners.
///
/// Backends resolve submitted batches from here. A function that is not
/// registered in the worker process cannot be dispatched to it.
pub struct FunctionRegistry {
    functions: Mutex<HashMap<String, Arc<dyn BatchRunner>>>,
}

impl FunctionRegistry {
    fn new() -> Self {
        Self {
            functions: Mutex::new(HashMap::new()),
        }
    }

    pub fn global() -> &'static Self {
        &REGISTRY
    }

    pub fn register(&self, runner: Arc<dyn BatchRunner>) {
        let name = runner.name().to_string();
        if self.functions().insert(name.clone(), runner).is_some() {
            warn!("function {name} has been re-registered");
        }
    }

    pub fn resolve(&self, name: &str) -> ParallelResult<Arc<dyn BatchRunner>> {
        self.functions()
            .get(name)
            .cloned()
            .ok_or_else(|| ParallelError::Backend(format!("function {name} is not registered")))
    }

    fn functions(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn BatchRunner>>> {
        self.functions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

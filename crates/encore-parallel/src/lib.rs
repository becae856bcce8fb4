//! Capture/replay parallelization for serial analysis code.
//!
//! A serial body of expensive, persistently memoized calls runs twice
//! inside a driver scope: the first run captures the calls and answers them
//! with placeholders, the driver then dispatches the captured calls to a
//! backend in batches, and the second run answers every call from the
//! cache populated by the parallel phase.

pub mod backend;
mod batch;
pub mod driver;
mod error;
mod function;
mod id;
mod registry;

pub use batch::{Batch, BatchKey, CallRecord};
pub use driver::{DriverMode, DriverOptions, DriverScope, ParallelEnvironment};
pub use error::{ParallelError, ParallelResult};
pub use function::{Batcher, DefaultBatcher, Parallelized};
pub use id::JobId;
pub use registry::{BatchRunner, FunctionRegistry};

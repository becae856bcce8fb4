mod engine;
mod options;
mod state;

pub(crate) use engine::{active_driver, DriverCore};
pub use engine::{DriverScope, ParallelEnvironment};
pub use options::DriverOptions;
pub use state::DriverMode;

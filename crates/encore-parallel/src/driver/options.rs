use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// The interval at which the driver polls the backend for batch
    /// completion while computing.
    pub poll_interval: Duration,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
        }
    }
}

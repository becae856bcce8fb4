use encore_cache::CacheError;
use thiserror::Error;

pub type ParallelResult<T> = Result<T, ParallelError>;

#[derive(Debug, Error)]
pub enum ParallelError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("contract violation: {0}")]
    Contract(String),
    #[error("backend error: {0}")]
    Backend(String),
    /// A call issued during replay was neither captured nor cached, so the
    /// user body did not issue the same calls on both runs.
    #[error("capture determinism violation: {0}")]
    CaptureDeterminism(String),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("internal error: {0}")]
    Internal(String),
}

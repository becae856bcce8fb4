use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("error in cache storage: {0}")]
    Storage(String),
    #[error("error in cache serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("error in cache I/O: {0}")]
    Io(#[from] std::io::Error),
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ParallelError, ParallelResult};

/// A grouping token for calls that should execute together.
///
/// The token is a digest of the user key value's canonical serialization,
/// so the value itself only needs to serialize, not to hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchKey(u64);

impl BatchKey {
    pub fn compute<K: Serialize>(key: &K) -> ParallelResult<Self> {
        let serialized = serde_json::to_string(key).map_err(|e| {
            ParallelError::Contract(format!("the batch key is not serializable: {e}"))
        })?;
        let digest = blake3::hash(serialized.as_bytes());
        let mut bytes = [0_u8; 8];
        bytes.copy_from_slice(&digest.as_bytes()[..8]);
        Ok(Self(u64::from_le_bytes(bytes)))
    }
}

impl std::fmt::Display for BatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A single parallelizable call observed during capture.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub function: String,
    pub key: BatchKey,
    pub arguments: Value,
}

/// An ordered group of calls to one function sharing a batch key.
/// The calls keep their arrival order; duplicates are preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub function: String,
    pub key: BatchKey,
    pub calls: Vec<Value>,
}

impl Batch {
    pub fn new(function: String, key: BatchKey) -> Self {
        Self {
            function,
            key,
            calls: vec![],
        }
    }
}

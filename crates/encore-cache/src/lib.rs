//! Persistent memoization for expensive computations, keyed by a stable
//! function name and the call arguments.

mod error;
mod fingerprint;
mod fs;
mod memo;
mod memory;
mod scope;
mod store;

pub use error::{CacheError, CacheResult};
pub use fingerprint::Fingerprint;
pub use fs::FileSystemCache;
pub use memo::{Computation, Memoized};
pub use memory::MemoryCache;
pub use scope::{caching_into, current_cache, with_cache, CacheScope};
pub use store::{CacheExt, CacheRef, PersistentCache};

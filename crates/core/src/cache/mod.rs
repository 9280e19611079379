//! Tiered in-memory cache.
//!
//! Two independently bounded stores:
//! - metadata (hours-scale TTL)
//! - live data (seconds-scale TTL per category)
//!
//! Staleness is never stored. [`CacheStatus`] is derived on every read from
//! the entry timestamps and the clock.

mod model;
mod store;
mod tiered;

pub use model::{CacheStats, CacheStatus, CachedAsset, SweepReport};
pub use store::BoundedStore;
pub use tiered::TieredCache;

//! TickerHub Core - caching, prefetching and the read facade.
//!
//! Builds on `tickerhub-market-data` (providers, rate tracking, routing):
//!
//! ```text
//! Gateway
//!   ├── AggregationFacade   get_single / get_page / search / diagnostics
//!   ├── TieredCache         metadata store + live store, per-category TTLs
//!   ├── PrefetchService     discovery, then metadata, then live data
//!   └── FallbackRouter      (tickerhub-market-data)
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod discovery;
pub mod errors;
pub mod facade;
pub mod gateway;
pub mod prefetch;
pub mod providers;

#[cfg(test)]
mod test_support;

pub use cache::{CacheStats, CacheStatus, CachedAsset, TieredCache};
pub use config::{CacheConfig, GatewayConfig, PrefetchConfig, SchedulerConfig};
pub use discovery::{CatalogDiscovery, DiscoverySource, ProviderDiscovery, StaticCatalog};
pub use facade::{
    AggregationFacade, AssetView, GatewayDiagnostics, Page, PageRequest, SortBy, SortOrder,
};
pub use gateway::Gateway;
pub use prefetch::{PrefetchService, PrefetchState, RefreshReport};
pub use providers::{build_providers, ProviderCredentials, ProviderSet};

pub use errors::Error;
pub use errors::Result;

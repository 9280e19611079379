//! Aggregation facade.
//!
//! The only surface an outer layer (REST, CLI) talks to. Composes the tiered
//! cache, the fallback router and the prefetch service:
//! - `get_single` - one asset, live-fetched when the cache isn't fresh
//! - `get_page` - sorted, filtered page of a category, from cache only
//! - `search` - ranked symbol/name search across categories
//! - `get_diagnostics` - rate, queue, cache and prefetch state
//! - `refresh` - manual prefetch of one or all categories
//!
//! None of these return errors.

mod model;
mod service;

pub use model::{
    AssetView, GatewayDiagnostics, Page, PageRequest, ProviderDiagnostics, SortBy, SortOrder,
};
pub use service::AggregationFacade;

//! Target symbol sets for the prefetch loop.
//!
//! [`ProviderDiscovery`] asks discovery-capable providers through the router
//! and falls back to the built-in [`StaticCatalog`].

mod catalog;
mod source;

pub use catalog::StaticCatalog;
pub use source::{CatalogDiscovery, DiscoverySource, ProviderDiscovery};

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use tickerhub_market_data::{AssetCategory, AssetMetadata, FallbackRouter, RouteOutcome, SharedClock};

use super::catalog::StaticCatalog;

/// Produces the symbols the prefetch loop keeps warm.
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Up to `limit` assets of `category`. Never fails; an empty list means
    /// nothing to prefetch.
    async fn discover(&self, category: AssetCategory, limit: usize) -> Vec<AssetMetadata>;
}

/// The built-in catalog alone, stamped with the gateway clock.
pub struct CatalogDiscovery {
    catalog: StaticCatalog,
    clock: SharedClock,
}

impl CatalogDiscovery {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            catalog: StaticCatalog::new(),
            clock,
        }
    }
}

#[async_trait]
impl DiscoverySource for CatalogDiscovery {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn discover(&self, category: AssetCategory, limit: usize) -> Vec<AssetMetadata> {
        self.catalog.list(category, limit, self.clock.now())
    }
}

/// Provider listings with the static catalog behind them.
pub struct ProviderDiscovery {
    router: Arc<FallbackRouter>,
    catalog: StaticCatalog,
    clock: SharedClock,
}

impl ProviderDiscovery {
    pub fn new(router: Arc<FallbackRouter>, clock: SharedClock) -> Self {
        Self {
            router,
            catalog: StaticCatalog::new(),
            clock,
        }
    }

    /// Fill gaps in a provider listing from the catalog entry for the same symbol.
    fn enrich(&self, listed: Vec<AssetMetadata>) -> Vec<AssetMetadata> {
        let now = self.clock.now();
        listed
            .into_iter()
            .map(|metadata| match self.catalog.lookup(&metadata.symbol, now) {
                Some(known) if known.category == metadata.category => metadata.merge_missing(&known),
                _ => metadata,
            })
            .collect()
    }
}

#[async_trait]
impl DiscoverySource for ProviderDiscovery {
    fn name(&self) -> &'static str {
        "provider"
    }

    async fn discover(&self, category: AssetCategory, limit: usize) -> Vec<AssetMetadata> {
        match self.router.discover(category, limit).await {
            RouteOutcome::Resolved {
                value, provider, ..
            } => {
                info!(
                    "Discovery: {} {} assets listed by {}",
                    value.len(),
                    category,
                    provider
                );
                let mut listed = self.enrich(value);
                listed.truncate(limit);
                listed
            }
            RouteOutcome::CapabilityExhausted { diagnostics, .. } => {
                if diagnostics.attempts.is_empty() {
                    debug!("Discovery: no provider lists {}, using catalog", category);
                } else {
                    info!(
                        "Discovery: provider listing for {} failed [{}], using catalog",
                        category,
                        diagnostics.summary()
                    );
                }
                self.catalog.list(category, limit, self.clock.now())
            }
        }
    }
}

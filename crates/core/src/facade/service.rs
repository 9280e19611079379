use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, warn};
use rust_decimal::Decimal;
use tickerhub_market_data::{
    normalize_symbol, AssetCategory, AssetMetadata, Capability, FallbackRouter, PriorityClass,
    RouteOutcome, SharedClock,
};

use super::model::{
    AssetView, GatewayDiagnostics, Page, PageRequest, ProviderDiagnostics, SortBy, SortOrder,
};
use crate::cache::{CacheStatus, TieredCache};
use crate::constants::MAX_PAGE_SIZE;
use crate::discovery::StaticCatalog;
use crate::prefetch::{PrefetchService, RefreshReport};

/// Read side of the gateway.
pub struct AggregationFacade {
    cache: Arc<TieredCache>,
    router: Arc<FallbackRouter>,
    prefetch: Arc<PrefetchService>,
    catalog: StaticCatalog,
    clock: SharedClock,
}

impl AggregationFacade {
    pub fn new(
        cache: Arc<TieredCache>,
        router: Arc<FallbackRouter>,
        prefetch: Arc<PrefetchService>,
        clock: SharedClock,
    ) -> Self {
        Self {
            cache,
            router,
            prefetch,
            catalog: StaticCatalog::new(),
            clock,
        }
    }

    /// One asset, fresh when any provider can deliver it.
    ///
    /// Serves a fresh cache hit directly. Otherwise fetches live data; if
    /// every provider fails, the cached value is returned marked stale, or a
    /// zero-value record when nothing is cached.
    pub async fn get_single(&self, symbol: &str) -> AssetView {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return AssetView::empty(&symbol);
        }

        let cached = self.cache.get(&symbol);
        if cached.status == CacheStatus::Fresh {
            return AssetView::from_cached(&cached);
        }

        let known = self.catalog.lookup(&symbol, self.clock.now());
        let category = cached
            .category
            .or_else(|| known.as_ref().map(|m| m.category))
            .unwrap_or(AssetCategory::Stock);

        match self
            .router
            .fetch_quote(&symbol, category, PriorityClass::High)
            .await
        {
            RouteOutcome::Resolved {
                value, provider, ..
            } => {
                debug!("Facade: {} refreshed from {}", symbol, provider);
                // Past the fresh-hit check, Fallback means metadata is missing or expired
                if cached.status == CacheStatus::Fallback {
                    self.refresh_metadata(&symbol, category, known, cached.metadata)
                        .await;
                }
                self.cache.set_live_data(value, category);
                AssetView::from_cached(&self.cache.get(&symbol))
            }
            RouteOutcome::CapabilityExhausted { diagnostics, .. } => {
                if cached.is_empty() {
                    debug!(
                        "Facade: no data for {} [{}]",
                        symbol,
                        diagnostics.summary()
                    );
                    return AssetView::empty(&symbol);
                }
                warn!(
                    "Facade: serving cached {} after providers failed [{}]",
                    symbol,
                    diagnostics.summary()
                );
                let mut view = AssetView::from_cached(&cached);
                view.is_stale = true;
                view
            }
        }
    }

    /// Replace missing or expired metadata: catalog entry first, then a
    /// provider profile, else re-stamp the expired entry so newly fetched live
    /// data is not reported stale.
    async fn refresh_metadata(
        &self,
        symbol: &str,
        category: AssetCategory,
        known: Option<AssetMetadata>,
        expired: Option<AssetMetadata>,
    ) {
        if let Some(metadata) = known {
            self.cache.set_metadata(metadata);
            return;
        }

        match self
            .router
            .fetch_profile(symbol, category, PriorityClass::Normal)
            .await
        {
            RouteOutcome::Resolved {
                value, provider, ..
            } => {
                debug!("Facade: {} profile from {}", symbol, provider);
                let metadata = match &expired {
                    Some(previous) => value.merge_missing(previous),
                    None => value,
                };
                self.cache.set_metadata(metadata);
            }
            RouteOutcome::CapabilityExhausted { diagnostics, .. } => {
                debug!(
                    "Facade: no profile for {} [{}]",
                    symbol,
                    diagnostics.summary()
                );
                if let Some(mut previous) = expired {
                    previous.last_updated = self.clock.now();
                    self.cache.set_metadata(previous);
                }
            }
        }
    }

    /// A page of cached assets in `category`. Never calls a provider.
    pub fn get_page(&self, category: AssetCategory, request: PageRequest) -> Page<AssetView> {
        let request = request.normalized();
        let needle = request.search.as_deref().map(str::to_lowercase);

        let mut views: Vec<AssetView> = self
            .cache
            .symbols(category)
            .iter()
            .map(|symbol| AssetView::from_cached(&self.cache.get(symbol)))
            .filter(|view| {
                needle
                    .as_deref()
                    .is_none_or(|needle| search_rank(view, needle).is_some())
            })
            .collect();

        views.sort_by(|a, b| compare_views(a, b, request.sort_by, request.sort_order));
        Page::from_sorted(views, request.page, request.page_size)
    }

    /// Cached assets matching `query` on symbol or name, best matches first:
    /// exact symbol, then symbol prefix, then any other match. Ties go to the
    /// larger market cap.
    pub fn search(&self, query: &str, limit: usize) -> Vec<AssetView> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() || limit == 0 {
            return Vec::new();
        }

        let symbols: BTreeSet<String> = AssetCategory::ALL
            .iter()
            .flat_map(|category| self.cache.symbols(*category))
            .collect();

        let mut ranked: Vec<(u8, AssetView)> = symbols
            .iter()
            .filter_map(|symbol| {
                let view = AssetView::from_cached(&self.cache.get(symbol));
                search_rank(&view, &needle).map(|rank| (rank, view))
            })
            .collect();

        ranked.sort_by(|(rank_a, a), (rank_b, b)| {
            rank_a
                .cmp(rank_b)
                .then_with(|| compare_optional(a.market_cap, b.market_cap, SortOrder::Desc))
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        ranked
            .into_iter()
            .take(limit.min(MAX_PAGE_SIZE))
            .map(|(_, view)| view)
            .collect()
    }

    pub fn get_diagnostics(&self) -> GatewayDiagnostics {
        let scheduler = self.router.scheduler();
        let tracker = scheduler.tracker();

        let providers = self
            .router
            .providers()
            .iter()
            .map(|provider| ProviderDiagnostics {
                id: provider.id().to_string(),
                is_demo: provider.is_demo(),
                capabilities: provider.capabilities().capabilities.to_vec(),
                queue_len: scheduler.queue_len(provider.id()),
                rate: tracker.snapshot(provider.id()),
            })
            .collect();

        let chains = Capability::ALL
            .iter()
            .map(|capability| {
                let chain = self
                    .router
                    .ordered_chain(*capability)
                    .iter()
                    .map(|id| id.to_string())
                    .collect();
                (*capability, chain)
            })
            .collect();

        GatewayDiagnostics {
            generated_at: self.clock.now(),
            routing_mode: self.router.mode(),
            providers,
            chains,
            cache: self.cache.stats(),
            prefetch: self.prefetch.states(),
        }
    }

    /// Manual prefetch; waits for any running refresh of the same category.
    pub async fn refresh(&self, category: Option<AssetCategory>) -> Vec<RefreshReport> {
        self.prefetch.refresh(category).await
    }
}

/// 0 = exact symbol, 1 = symbol prefix, 2 = symbol or name contains.
fn search_rank(view: &AssetView, needle: &str) -> Option<u8> {
    let symbol = view.symbol.to_lowercase();
    if symbol == needle {
        Some(0)
    } else if symbol.starts_with(needle) {
        Some(1)
    } else if symbol.contains(needle) || view.display_name.to_lowercase().contains(needle) {
        Some(2)
    } else {
        None
    }
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

/// Missing values sort last in either direction.
fn compare_optional(a: Option<Decimal>, b: Option<Decimal>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => directed(a.cmp(&b), order),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_views(a: &AssetView, b: &AssetView, sort_by: SortBy, order: SortOrder) -> Ordering {
    // Entries without live data go last whatever the sort
    match (a.has_live_data(), b.has_live_data()) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    let ordering = match sort_by {
        SortBy::MarketCap => compare_optional(a.market_cap, b.market_cap, order),
        SortBy::Price => directed(a.price.cmp(&b.price), order),
        SortBy::Change24h => compare_optional(a.change_24h, b.change_24h, order),
        SortBy::Volume => compare_optional(a.volume_24h, b.volume_24h, order),
        SortBy::Symbol => directed(a.symbol.cmp(&b.symbol), order),
        SortBy::Name => directed(
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase()),
            order,
        ),
    };
    ordering.then_with(|| a.symbol.cmp(&b.symbol))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal_macros::dec;
    use tickerhub_market_data::{Clock, LiveQuote, ManualClock, MarketDataProvider};

    use super::*;
    use crate::config::{CacheConfig, PrefetchConfig};
    use crate::discovery::CatalogDiscovery;
    use crate::test_support::{router_with, MockProvider};

    struct Fixture {
        facade: AggregationFacade,
        cache: Arc<TieredCache>,
        clock: Arc<ManualClock>,
        equities: Arc<MockProvider>,
        crypto: Arc<MockProvider>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::starting_now());
        let shared: SharedClock = clock.clone();
        let equities = Arc::new(
            MockProvider::equity("EQ", shared.clone())
                .with_quote("AAPL", dec!(190))
                .with_profile("NEWCO", "Industrials"),
        );
        let crypto = Arc::new(MockProvider::crypto("CX", shared.clone()).with_quote("BTC", dec!(65000)));
        let router = router_with(
            vec![
                equities.clone() as Arc<dyn MarketDataProvider>,
                crypto.clone() as Arc<dyn MarketDataProvider>,
            ],
            shared.clone(),
        );
        let cache = Arc::new(TieredCache::new(CacheConfig::default(), shared.clone()));
        let prefetch = Arc::new(PrefetchService::new(
            router.clone(),
            cache.clone(),
            Arc::new(CatalogDiscovery::new(shared.clone())),
            PrefetchConfig {
                stock_universe: 2,
                ..PrefetchConfig::default()
            },
            shared.clone(),
        ));
        Fixture {
            facade: AggregationFacade::new(cache.clone(), router, prefetch, shared),
            cache,
            clock,
            equities,
            crypto,
        }
    }

    fn seed(fx: &Fixture, symbol: &str, name: &str, category: AssetCategory, price: Option<Decimal>) {
        fx.cache
            .set_metadata(AssetMetadata::new(symbol, name, category, fx.clock.now()));
        if let Some(price) = price {
            fx.cache.set_live_data(
                LiveQuote::new(symbol, price, "SEED", fx.clock.now())
                    .with_market_cap(Some(price * dec!(10))),
                category,
            );
        }
    }

    #[tokio::test]
    async fn test_get_single_fetches_and_caches() {
        let fx = fixture();

        let view = fx.facade.get_single("aapl").await;
        assert_eq!(view.symbol, "AAPL");
        assert_eq!(view.price, dec!(190));
        assert_eq!(view.source, "EQ");
        assert_eq!(view.display_name, "Apple Inc.");
        assert_eq!(view.status, CacheStatus::Fresh);
        assert!(!view.is_stale);

        // Second read is a fresh cache hit
        fx.facade.get_single("AAPL").await;
        assert_eq!(fx.equities.calls(), 1);
    }

    #[tokio::test]
    async fn test_get_single_routes_by_category() {
        let fx = fixture();
        let view = fx.facade.get_single("BTC").await;
        assert_eq!(view.source, "CX");
        assert_eq!(view.category, Some(AssetCategory::Crypto));
        assert_eq!(fx.equities.calls(), 0);
        assert_eq!(fx.crypto.calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_served_when_providers_fail() {
        let fx = fixture();
        seed(&fx, "AAPL", "Apple Inc.", AssetCategory::Stock, Some(dec!(100)));
        fx.equities.set_failing(true);

        fx.clock.advance_ms(29_999);
        let view = fx.facade.get_single("AAPL").await;
        assert_eq!(view.status, CacheStatus::Fresh);
        assert_eq!(view.price, dec!(100));
        assert_eq!(fx.equities.calls(), 0);

        fx.clock.advance_ms(2);
        let view = fx.facade.get_single("AAPL").await;
        assert_eq!(view.status, CacheStatus::Stale);
        assert_eq!(view.price, dec!(100));
        assert!(view.is_stale);
        assert_eq!(fx.equities.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_symbol_yields_zero_record() {
        let fx = fixture();
        fx.equities.set_failing(true);

        let view = fx.facade.get_single("ZZZ").await;
        assert_eq!(view, AssetView::empty("ZZZ"));
    }

    #[tokio::test]
    async fn test_unknown_symbol_serves_last_cached_value() {
        let fx = fixture();
        seed(&fx, "ZZZ", "Zed Corp", AssetCategory::Stock, Some(dec!(3)));
        fx.clock.advance(Duration::from_secs(7 * 60 * 60));

        let view = fx.facade.get_single("ZZZ").await;
        assert_eq!(view.price, dec!(3));
        assert_eq!(view.status, CacheStatus::Fallback);
        assert!(view.is_stale);
    }

    #[tokio::test]
    async fn test_refetch_after_metadata_expiry_reads_fresh() {
        let fx = fixture();
        seed(&fx, "ZZZ", "Zed Corp", AssetCategory::Stock, Some(dec!(3)));
        fx.clock.advance(Duration::from_secs(7 * 60 * 60));
        fx.equities.set_price("ZZZ", dec!(4));

        let view = fx.facade.get_single("ZZZ").await;
        assert_eq!(view.price, dec!(4));
        assert_eq!(view.display_name, "Zed Corp");
        assert_eq!(view.status, CacheStatus::Fresh);
        assert!(!view.is_stale);
        assert_eq!(fx.equities.profile_calls(), 1);

        // Later reads inside the live TTL stay in the cache
        for _ in 0..3 {
            fx.clock.advance(Duration::from_secs(5));
            assert_eq!(fx.facade.get_single("ZZZ").await.status, CacheStatus::Fresh);
        }
        assert_eq!(fx.equities.calls(), 1);
    }

    #[tokio::test]
    async fn test_uncatalogued_symbol_gets_provider_profile() {
        let fx = fixture();
        fx.equities.set_price("NEWCO", dec!(12));

        let view = fx.facade.get_single("newco").await;
        assert_eq!(view.price, dec!(12));
        assert_eq!(view.display_name, "NEWCO Holdings");
        assert_eq!(view.sector.as_deref(), Some("Industrials"));
        assert_eq!(view.status, CacheStatus::Fresh);
        assert_eq!(fx.equities.profile_calls(), 1);

        // Catalogued symbols never need a profile call
        fx.facade.get_single("AAPL").await;
        assert_eq!(fx.equities.profile_calls(), 1);
    }

    #[tokio::test]
    async fn test_get_page_sorts_and_pages() {
        let fx = fixture();
        seed(&fx, "AAA", "Alpha", AssetCategory::Stock, Some(dec!(10)));
        seed(&fx, "BBB", "Bravo", AssetCategory::Stock, Some(dec!(30)));
        seed(&fx, "CCC", "Charlie", AssetCategory::Stock, Some(dec!(20)));
        seed(&fx, "DDD", "Delta", AssetCategory::Stock, None);
        seed(&fx, "ETH", "Ethereum", AssetCategory::Crypto, Some(dec!(3000)));

        let page = fx.facade.get_page(
            AssetCategory::Stock,
            PageRequest {
                page_size: 3,
                ..PageRequest::default()
            },
        );
        let symbols: Vec<&str> = page.items.iter().map(|v| v.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BBB", "CCC", "AAA"]);
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);

        let ascending = fx.facade.get_page(
            AssetCategory::Stock,
            PageRequest {
                sort_by: SortBy::Price,
                sort_order: SortOrder::Asc,
                ..PageRequest::default()
            },
        );
        let symbols: Vec<&str> = ascending.items.iter().map(|v| v.symbol.as_str()).collect();
        // No live data sorts last in either direction
        assert_eq!(symbols, vec!["AAA", "CCC", "BBB", "DDD"]);
        assert_eq!(fx.equities.calls(), 0);
    }

    #[tokio::test]
    async fn test_get_page_search_filter() {
        let fx = fixture();
        seed(&fx, "AAA", "Alpha", AssetCategory::Stock, Some(dec!(10)));
        seed(&fx, "BBB", "Bravo", AssetCategory::Stock, Some(dec!(30)));

        let page = fx.facade.get_page(
            AssetCategory::Stock,
            PageRequest {
                search: Some("brav".to_string()),
                ..PageRequest::default()
            },
        );
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].symbol, "BBB");
    }

    #[tokio::test]
    async fn test_search_ranking() {
        let fx = fixture();
        seed(&fx, "SOLX", "Solar Index", AssetCategory::Etf, Some(dec!(5)));
        seed(&fx, "SOL", "Solana", AssetCategory::Crypto, Some(dec!(150)));
        seed(&fx, "ABC", "Consolidated Co", AssetCategory::Stock, Some(dec!(1000)));
        seed(&fx, "SOLB", "Sol Bank", AssetCategory::Stock, Some(dec!(50)));

        let results = fx.facade.search("Sol", 10);
        let symbols: Vec<&str> = results.iter().map(|v| v.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["SOL", "SOLB", "SOLX", "ABC"]);

        assert_eq!(fx.facade.search("sol", 1).len(), 1);
        assert!(fx.facade.search("sol", 0).is_empty());
        assert!(fx.facade.search("  ", 10).is_empty());
        assert!(fx.facade.search("nothing", 10).is_empty());
    }

    #[tokio::test]
    async fn test_diagnostics_cover_providers_cache_and_prefetch() {
        let fx = fixture();
        fx.facade.get_single("AAPL").await;

        let diagnostics = fx.facade.get_diagnostics();
        assert_eq!(diagnostics.providers.len(), 2);
        let eq = &diagnostics.providers[0];
        assert_eq!(eq.id, "EQ");
        assert_eq!(eq.queue_len, 0);
        assert_eq!(eq.rate.as_ref().unwrap().requests_last_minute, 1);
        assert_eq!(diagnostics.chains[&Capability::CryptoQuote], vec!["CX".to_string()]);
        assert_eq!(diagnostics.cache.live_entries, 1);
        assert_eq!(diagnostics.prefetch.len(), 3);

        let json = serde_json::to_value(&diagnostics).unwrap();
        assert!(json["chains"]["EQUITY_QUOTE"].is_array());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_one_category() {
        let fx = fixture();
        let reports = fx.facade.refresh(Some(AssetCategory::Stock)).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].targets, 2);
        assert_eq!(fx.cache.symbols(AssetCategory::Stock), vec!["AAPL", "MSFT"]);
    }
}

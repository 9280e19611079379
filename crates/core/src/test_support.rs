//! Mock provider and wiring shared by the crate's unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tickerhub_market_data::{
    AssetCategory, AssetMetadata, Capability, FallbackRouter, LiveQuote, MarketDataError,
    MarketDataProvider, ProviderCapabilities, ProviderConfig, RateTracker, RequestScheduler,
    SchedulerConfig, SharedClock,
};
use tokio_util::sync::CancellationToken;

pub struct MockProvider {
    id: &'static str,
    config: ProviderConfig,
    capabilities: &'static [Capability],
    discovery: bool,
    prices: Mutex<HashMap<String, Decimal>>,
    listing: Vec<(&'static str, &'static str)>,
    sectors: HashMap<&'static str, &'static str>,
    failing: AtomicBool,
    calls: AtomicUsize,
    profile_calls: AtomicUsize,
    clock: SharedClock,
}

impl MockProvider {
    fn new(id: &'static str, capabilities: &'static [Capability], clock: SharedClock) -> Self {
        Self {
            id,
            config: ProviderConfig::new(id)
                .with_burst(1_000)
                .with_windows(10_000, 100_000, 1_000_000)
                .with_retry(0, Duration::from_millis(1)),
            capabilities,
            discovery: false,
            prices: Mutex::new(HashMap::new()),
            listing: Vec::new(),
            sectors: HashMap::new(),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
            clock,
        }
    }

    pub fn equity(id: &'static str, clock: SharedClock) -> Self {
        Self::new(id, &[Capability::EquityQuote, Capability::EquityProfile], clock)
    }

    pub fn crypto(id: &'static str, clock: SharedClock) -> Self {
        Self::new(id, &[Capability::CryptoQuote, Capability::CryptoProfile], clock)
    }

    pub fn with_quote(self, symbol: &str, price: Decimal) -> Self {
        self.set_price(symbol, price);
        self
    }

    pub fn with_listing(mut self, listing: Vec<(&'static str, &'static str)>) -> Self {
        self.discovery = true;
        self.listing = listing;
        self
    }

    /// Serve a profile for `symbol` with the given sector.
    pub fn with_profile(mut self, symbol: &'static str, sector: &'static str) -> Self {
        self.sectors.insert(symbol, sector);
        self
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices
            .lock()
            .unwrap()
            .insert(symbol.to_string(), price);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            capabilities: self.capabilities,
            supports_discovery: self.discovery,
        }
    }

    async fn get_quote(
        &self,
        symbol: &str,
        _category: AssetCategory,
    ) -> Result<LiveQuote, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(MarketDataError::provider(self.id, "upstream unavailable"));
        }
        let price = self.prices.lock().unwrap().get(symbol).copied();
        match price {
            Some(price) => Ok(LiveQuote::new(symbol, price, self.id, self.clock.now())
                .with_market_cap(Some(price * Decimal::from(1_000)))),
            None => Err(MarketDataError::SymbolNotFound(symbol.to_string())),
        }
    }

    async fn get_profile(
        &self,
        symbol: &str,
        category: AssetCategory,
    ) -> Result<AssetMetadata, MarketDataError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(MarketDataError::provider(self.id, "upstream unavailable"));
        }
        match self.sectors.get(symbol) {
            Some(sector) => {
                let mut metadata =
                    AssetMetadata::new(symbol, format!("{} Holdings", symbol), category, self.clock.now());
                metadata.sector = Some(sector.to_string());
                Ok(metadata)
            }
            None => Err(MarketDataError::SymbolNotFound(symbol.to_string())),
        }
    }

    async fn discover(
        &self,
        category: AssetCategory,
        limit: usize,
    ) -> Result<Vec<AssetMetadata>, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(MarketDataError::provider(self.id, "upstream unavailable"));
        }
        Ok(self
            .listing
            .iter()
            .take(limit)
            .map(|(symbol, name)| AssetMetadata::new(*symbol, *name, category, self.clock.now()))
            .collect())
    }
}

pub fn router_with(providers: Vec<Arc<dyn MarketDataProvider>>, clock: SharedClock) -> Arc<FallbackRouter> {
    let tracker = Arc::new(RateTracker::new(clock.clone()));
    let scheduler = RequestScheduler::new(
        tracker,
        clock.clone(),
        SchedulerConfig::default(),
        CancellationToken::new(),
    );
    Arc::new(FallbackRouter::new(providers, scheduler, clock))
}

//! Gateway assembly and lifecycle.
//!
//! Wires the rate tracker, scheduler, router, cache, prefetcher and facade
//! together and owns the background tasks (cache sweeper, prefetch loop).

use std::sync::{Arc, Mutex};

use log::{info, warn};
use tickerhub_market_data::{
    system_clock, FallbackRouter, MarketDataProvider, RateTracker, RequestScheduler, SharedClock,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::TieredCache;
use crate::config::GatewayConfig;
use crate::discovery::{DiscoverySource, ProviderDiscovery};
use crate::errors::Result;
use crate::facade::AggregationFacade;
use crate::prefetch::PrefetchService;

pub struct Gateway {
    config: GatewayConfig,
    clock: SharedClock,
    router: Arc<FallbackRouter>,
    cache: Arc<TieredCache>,
    prefetch: Arc<PrefetchService>,
    facade: Arc<AggregationFacade>,
    cancel: CancellationToken,
    tasks: Mutex<Option<Vec<JoinHandle<()>>>>,
}

impl Gateway {
    pub fn new(config: GatewayConfig, providers: Vec<Arc<dyn MarketDataProvider>>) -> Result<Self> {
        Self::with_clock(config, providers, system_clock())
    }

    /// Build with an explicit clock. Nothing runs until [`Gateway::start`].
    pub fn with_clock(
        config: GatewayConfig,
        providers: Vec<Arc<dyn MarketDataProvider>>,
        clock: SharedClock,
    ) -> Result<Self> {
        config.validate()?;

        let cancel = CancellationToken::new();
        let tracker = Arc::new(RateTracker::new(clock.clone()));
        let scheduler = RequestScheduler::new(
            tracker,
            clock.clone(),
            config.scheduler.clone(),
            cancel.child_token(),
        );
        let router = Arc::new(
            FallbackRouter::new(providers, scheduler, clock.clone()).with_mode(config.routing_mode),
        );
        let cache = Arc::new(TieredCache::new(config.cache.clone(), clock.clone()));
        let discovery: Arc<dyn DiscoverySource> =
            Arc::new(ProviderDiscovery::new(router.clone(), clock.clone()));
        let prefetch = Arc::new(PrefetchService::new(
            router.clone(),
            cache.clone(),
            discovery,
            config.prefetch.clone(),
            clock.clone(),
        ));
        let facade = Arc::new(AggregationFacade::new(
            cache.clone(),
            router.clone(),
            prefetch.clone(),
            clock.clone(),
        ));

        Ok(Self {
            config,
            clock,
            router,
            cache,
            prefetch,
            facade,
            cancel,
            tasks: Mutex::new(None),
        })
    }

    /// Spawn the cache sweeper and the prefetch loop. Calling it again while
    /// running is a no-op.
    pub fn start(&self) {
        let mut tasks = self.lock_tasks();
        if tasks.is_some() {
            warn!("Gateway already started");
            return;
        }
        if self.cancel.is_cancelled() {
            warn!("Gateway was shut down, not restarting");
            return;
        }

        let sweeper = tokio::spawn(self.cache.clone().run_sweeper(self.cancel.clone()));
        let prefetch = tokio::spawn(self.prefetch.clone().run(self.cancel.clone()));
        *tasks = Some(vec![sweeper, prefetch]);

        info!(
            "Gateway started with {} providers (routing: {:?}, prefetch every {:?})",
            self.router.providers().len(),
            self.router.mode(),
            self.config.prefetch.interval
        );
    }

    pub fn is_running(&self) -> bool {
        self.lock_tasks().is_some() && !self.cancel.is_cancelled()
    }

    /// Stop background work and release every queued request.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handles = self.lock_tasks().take().unwrap_or_default();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Gateway task ended abnormally: {}", e);
            }
        }
        self.router.scheduler().shutdown().await;
        info!("Gateway stopped");
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn facade(&self) -> &Arc<AggregationFacade> {
        &self.facade
    }

    pub fn cache(&self) -> &Arc<TieredCache> {
        &self.cache
    }

    pub fn router(&self) -> &Arc<FallbackRouter> {
        &self.router
    }

    pub fn prefetch(&self) -> &Arc<PrefetchService> {
        &self.prefetch
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Option<Vec<JoinHandle<()>>>> {
        self.tasks.lock().unwrap_or_else(|poisoned| {
            warn!("Gateway task list lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use log::{debug, info, warn};
use tickerhub_market_data::{AssetCategory, FallbackRouter, PriorityClass, RouteOutcome, SharedClock};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::model::{PrefetchPhase, PrefetchState, RefreshReport};
use crate::cache::TieredCache;
use crate::config::PrefetchConfig;
use crate::discovery::DiscoverySource;

/// One async lock per category so refreshes of a category never overlap.
#[derive(Default)]
struct CategoryLocks {
    stock: tokio::sync::Mutex<()>,
    etf: tokio::sync::Mutex<()>,
    crypto: tokio::sync::Mutex<()>,
}

impl CategoryLocks {
    fn get(&self, category: AssetCategory) -> &tokio::sync::Mutex<()> {
        match category {
            AssetCategory::Stock => &self.stock,
            AssetCategory::Etf => &self.etf,
            AssetCategory::Crypto => &self.crypto,
        }
    }
}

/// Keeps the cache warm for each category's target universe.
pub struct PrefetchService {
    router: Arc<FallbackRouter>,
    cache: Arc<TieredCache>,
    discovery: Arc<dyn DiscoverySource>,
    config: PrefetchConfig,
    clock: SharedClock,
    locks: CategoryLocks,
    states: Mutex<HashMap<AssetCategory, PrefetchState>>,
}

impl PrefetchService {
    pub fn new(
        router: Arc<FallbackRouter>,
        cache: Arc<TieredCache>,
        discovery: Arc<dyn DiscoverySource>,
        config: PrefetchConfig,
        clock: SharedClock,
    ) -> Self {
        let states = AssetCategory::ALL
            .iter()
            .map(|category| (*category, PrefetchState::new(*category)))
            .collect();
        Self {
            router,
            cache,
            discovery,
            config,
            clock,
            locks: CategoryLocks::default(),
            states: Mutex::new(states),
        }
    }

    pub fn config(&self) -> &PrefetchConfig {
        &self.config
    }

    fn lock_states(&self) -> MutexGuard<'_, HashMap<AssetCategory, PrefetchState>> {
        self.states.lock().unwrap_or_else(|poisoned| {
            warn!("Prefetch state lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn update_state<F>(&self, category: AssetCategory, update: F)
    where
        F: FnOnce(&mut PrefetchState),
    {
        let mut states = self.lock_states();
        update(
            states
                .entry(category)
                .or_insert_with(|| PrefetchState::new(category)),
        );
    }

    pub fn state(&self, category: AssetCategory) -> PrefetchState {
        self.lock_states()
            .get(&category)
            .cloned()
            .unwrap_or_else(|| PrefetchState::new(category))
    }

    /// States of every category, in category order.
    pub fn states(&self) -> Vec<PrefetchState> {
        AssetCategory::ALL
            .iter()
            .map(|category| self.state(*category))
            .collect()
    }

    /// Refresh one category, or all of them in order.
    pub async fn refresh(&self, category: Option<AssetCategory>) -> Vec<RefreshReport> {
        let categories: Vec<AssetCategory> = match category {
            Some(category) => vec![category],
            None => AssetCategory::ALL.to_vec(),
        };

        let mut reports = Vec::with_capacity(categories.len());
        for category in categories {
            reports.push(self.refresh_category(category).await);
        }
        reports
    }

    /// Run one full refresh of `category`.
    ///
    /// Waits for an in-flight refresh of the same category to finish first.
    pub async fn refresh_category(&self, category: AssetCategory) -> RefreshReport {
        let lock = self.locks.get(category);
        let _guard = match lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Prefetch: {} refresh already running, waiting", category);
                lock.lock().await
            }
        };

        let started_at = self.clock.now();
        self.update_state(category, |state| {
            state.phase = PrefetchPhase::Metadata;
            state.last_started_at = Some(started_at);
        });

        let limit = self.config.universe_size(category);
        let targets = self.discovery.discover(category, limit).await;
        info!(
            "Prefetch: refreshing {} {} assets (source: {})",
            targets.len(),
            category,
            self.discovery.name()
        );

        let symbols: Vec<String> = targets.iter().map(|m| m.symbol.clone()).collect();
        let metadata_written = targets.len();
        for metadata in targets {
            self.cache.set_metadata(metadata);
        }

        self.update_state(category, |state| state.phase = PrefetchPhase::LiveData);

        let mut live_written = 0;
        let mut failed = Vec::new();
        let batch_size = self.config.batch_size.max(1);
        for (index, batch) in symbols.chunks(batch_size).enumerate() {
            if index > 0 && !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }

            let results = join_all(batch.iter().map(|symbol| self.fetch_live(symbol, category))).await;
            for (symbol, stored) in batch.iter().zip(results) {
                if stored {
                    live_written += 1;
                } else {
                    failed.push(symbol.clone());
                }
            }
        }

        let report = RefreshReport {
            category,
            targets: symbols.len(),
            metadata_written,
            live_written,
            failed,
            started_at,
            finished_at: self.clock.now(),
        };
        info!(
            "Prefetch: {} refresh done, {}/{} live, {} failed",
            category,
            report.live_written,
            report.targets,
            report.failed.len()
        );

        self.update_state(category, |state| {
            state.phase = PrefetchPhase::Idle;
            state.cycles += 1;
            state.last_report = Some(report.clone());
        });
        report
    }

    /// Fetch and cache one symbol. A failure is logged and reported as `false`.
    async fn fetch_live(&self, symbol: &str, category: AssetCategory) -> bool {
        match self
            .router
            .fetch_quote(symbol, category, PriorityClass::Low)
            .await
        {
            RouteOutcome::Resolved { value, .. } => {
                self.cache.set_live_data(value, category);
                true
            }
            RouteOutcome::CapabilityExhausted { diagnostics, .. } => {
                warn!(
                    "Prefetch: live data for {} unavailable [{}]",
                    symbol,
                    diagnostics.summary()
                );
                false
            }
        }
    }

    /// Periodic refresh of every category until `cancel` fires.
    ///
    /// The first cycle starts immediately.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        if !self.config.enabled {
            info!("Prefetch disabled");
            return;
        }

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Prefetch loop started, every {:?}", self.config.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.refresh(None) => {}
                    }
                }
            }
        }

        // A cycle cut short leaves its phase behind
        self.lock_states()
            .values_mut()
            .for_each(|state| state.phase = PrefetchPhase::Idle);
        info!("Prefetch loop stopped");
    }
}

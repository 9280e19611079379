//! Metadata + live data cache with read-time staleness.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use tickerhub_market_data::clock::elapsed_between;
use tickerhub_market_data::{normalize_symbol, AssetCategory, AssetMetadata, LiveQuote, SharedClock};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::model::{CacheStats, CacheStatus, CachedAsset, SweepReport};
use super::store::BoundedStore;
use crate::config::CacheConfig;

#[derive(Clone, Debug)]
struct LiveEntry {
    quote: LiveQuote,
    category: AssetCategory,
}

struct Stores {
    metadata: BoundedStore<AssetMetadata>,
    live: BoundedStore<LiveEntry>,
    evictions: u64,
    swept: u64,
}

/// Two-tier asset cache shared by the facade and the prefetch service.
pub struct TieredCache {
    config: CacheConfig,
    clock: SharedClock,
    stores: Mutex<Stores>,
}

impl TieredCache {
    pub fn new(config: CacheConfig, clock: SharedClock) -> Self {
        let stores = Stores {
            metadata: BoundedStore::new(config.metadata_max_entries),
            live: BoundedStore::new(config.live_max_entries),
            evictions: 0,
            swept: 0,
        };
        Self {
            config,
            clock,
            stores: Mutex::new(stores),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lock_stores(&self) -> MutexGuard<'_, Stores> {
        self.stores.lock().unwrap_or_else(|poisoned| {
            warn!("Cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn is_fresh(written_at: DateTime<Utc>, ttl: std::time::Duration, now: DateTime<Utc>) -> bool {
        elapsed_between(written_at, now) < ttl
    }

    /// Everything cached for `symbol`, with status computed against now.
    ///
    /// Always returns; an unknown symbol yields an empty `Fallback` record.
    pub fn get(&self, symbol: &str) -> CachedAsset {
        let symbol = normalize_symbol(symbol);
        let now = self.clock.now();
        let mut stores = self.lock_stores();

        let metadata = stores.metadata.get(&symbol, now);
        let live = stores.live.get(&symbol, now);
        drop(stores);

        let metadata_fresh = metadata
            .as_ref()
            .map(|(_, written)| Self::is_fresh(*written, self.config.metadata_ttl, now));
        let live_fresh = live.as_ref().map(|(entry, written)| {
            Self::is_fresh(*written, self.config.live_ttl(entry.category), now)
        });

        let category = metadata
            .as_ref()
            .map(|(m, _)| m.category)
            .or_else(|| live.as_ref().map(|(entry, _)| entry.category));

        CachedAsset {
            symbol,
            category,
            status: CacheStatus::derive(metadata_fresh, live_fresh),
            live_written_at: live.as_ref().map(|(_, written)| *written),
            metadata: metadata.map(|(m, _)| m),
            live: live.map(|(entry, _)| entry.quote),
        }
    }

    pub fn set_metadata(&self, mut metadata: AssetMetadata) {
        metadata.symbol = normalize_symbol(&metadata.symbol);
        let now = self.clock.now();
        let mut stores = self.lock_stores();
        if let Some(victim) = stores.metadata.insert(metadata.symbol.clone(), metadata, now) {
            stores.evictions += 1;
            debug!("Cache: evicted metadata for {}", victim);
        }
    }

    pub fn set_live_data(&self, mut quote: LiveQuote, category: AssetCategory) {
        quote.symbol = normalize_symbol(&quote.symbol);
        let now = self.clock.now();
        let mut stores = self.lock_stores();
        let key = quote.symbol.clone();
        if let Some(victim) = stores.live.insert(key, LiveEntry { quote, category }, now) {
            stores.evictions += 1;
            debug!("Cache: evicted live data for {}", victim);
        }
    }

    /// Remove both tiers for `symbol`. Returns whether anything was cached.
    pub fn evict(&self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        let mut stores = self.lock_stores();
        let metadata = stores.metadata.remove(&symbol);
        let live = stores.live.remove(&symbol);
        metadata || live
    }

    /// Drop expired metadata and live entries past hard retention.
    pub fn sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let metadata_ttl = self.config.metadata_ttl;
        let retention = self.config.live_retention;

        let mut stores = self.lock_stores();
        let report = SweepReport {
            metadata_removed: stores
                .metadata
                .remove_expired(|_, written| !Self::is_fresh(written, metadata_ttl, now)),
            live_removed: stores
                .live
                .remove_expired(|_, written| !Self::is_fresh(written, retention, now)),
        };
        stores.swept += report.total() as u64;
        report
    }

    /// Cached symbols of a category, sorted.
    pub fn symbols(&self, category: AssetCategory) -> Vec<String> {
        let stores = self.lock_stores();
        let mut symbols: BTreeSet<String> = stores
            .metadata
            .values()
            .filter(|m| m.category == category)
            .map(|m| m.symbol.clone())
            .collect();
        symbols.extend(
            stores
                .live
                .values()
                .filter(|entry| entry.category == category)
                .map(|entry| entry.quote.symbol.clone()),
        );
        symbols.into_iter().collect()
    }

    /// Category recorded for a symbol in either tier, without touching it.
    pub fn category_of(&self, symbol: &str) -> Option<AssetCategory> {
        let symbol = normalize_symbol(symbol);
        let stores = self.lock_stores();
        stores
            .metadata
            .peek(&symbol)
            .map(|m| m.category)
            .or_else(|| stores.live.peek(&symbol).map(|entry| entry.category))
    }

    pub fn stats(&self) -> CacheStats {
        let stores = self.lock_stores();
        CacheStats {
            metadata_entries: stores.metadata.len(),
            metadata_capacity: stores.metadata.capacity(),
            live_entries: stores.live.len(),
            live_capacity: stores.live.capacity(),
            evictions: stores.evictions,
            swept: stores.swept,
        }
    }

    /// Periodic sweep until `cancel` fires.
    pub async fn run_sweeper(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.sweep_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately; nothing to sweep yet
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Cache sweeper stopped");
                    return;
                }
                _ = interval.tick() => {
                    let report = self.sweep();
                    if report.total() > 0 {
                        debug!(
                            "Cache sweep removed {} metadata and {} live entries",
                            report.metadata_removed, report.live_removed
                        );
                    }
                }
            }
        }
    }
}

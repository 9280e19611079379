//! Gateway configuration.
//!
//! Everything has a working default; the server overrides a handful of
//! values from the environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tickerhub_market_data::{AssetCategory, RoutingMode};

pub use tickerhub_market_data::SchedulerConfig;

use crate::constants::*;
use crate::errors::{Error, Result};

/// Tiered cache limits and lifetimes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    pub metadata_max_entries: usize,
    pub live_max_entries: usize,
    pub equity_live_ttl: Duration,
    pub crypto_live_ttl: Duration,
    pub metadata_ttl: Duration,
    /// Live entries older than this are removed by the sweep.
    pub live_retention: Duration,
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            metadata_max_entries: DEFAULT_MAX_ENTRIES,
            live_max_entries: DEFAULT_MAX_ENTRIES,
            equity_live_ttl: EQUITY_LIVE_TTL,
            crypto_live_ttl: CRYPTO_LIVE_TTL,
            metadata_ttl: METADATA_TTL,
            live_retention: LIVE_HARD_RETENTION,
            sweep_interval: CACHE_SWEEP_INTERVAL,
        }
    }
}

impl CacheConfig {
    pub fn live_ttl(&self, category: AssetCategory) -> Duration {
        match category {
            AssetCategory::Stock | AssetCategory::Etf => self.equity_live_ttl,
            AssetCategory::Crypto => self.crypto_live_ttl,
        }
    }
}

/// Discovery/prefetch loop settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrefetchConfig {
    pub enabled: bool,
    pub interval: Duration,
    /// Concurrent live fetches per batch.
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub stock_universe: usize,
    pub etf_universe: usize,
    pub crypto_universe: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: PREFETCH_INTERVAL,
            batch_size: PREFETCH_BATCH_SIZE,
            batch_delay: PREFETCH_BATCH_DELAY,
            stock_universe: STOCK_UNIVERSE_SIZE,
            etf_universe: ETF_UNIVERSE_SIZE,
            crypto_universe: CRYPTO_UNIVERSE_SIZE,
        }
    }
}

impl PrefetchConfig {
    pub fn universe_size(&self, category: AssetCategory) -> usize {
        match category {
            AssetCategory::Stock => self.stock_universe,
            AssetCategory::Etf => self.etf_universe,
            AssetCategory::Crypto => self.crypto_universe,
        }
    }
}

/// Top-level gateway configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayConfig {
    pub cache: CacheConfig,
    pub prefetch: PrefetchConfig,
    pub scheduler: SchedulerConfig,
    pub routing_mode: RoutingMode,
}

impl GatewayConfig {
    /// Reject values the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        let batch = self.prefetch.batch_size;
        if !(MIN_PREFETCH_BATCH_SIZE..=MAX_PREFETCH_BATCH_SIZE).contains(&batch) {
            return Err(Error::InvalidConfigValue(format!(
                "prefetch batch size {} outside {}..={}",
                batch, MIN_PREFETCH_BATCH_SIZE, MAX_PREFETCH_BATCH_SIZE
            )));
        }
        if self.cache.metadata_max_entries == 0 || self.cache.live_max_entries == 0 {
            return Err(Error::InvalidConfigValue(
                "cache stores need room for at least one entry".to_string(),
            ));
        }
        if self.prefetch.interval.is_zero() {
            return Err(Error::InvalidConfigValue(
                "prefetch interval must be positive".to_string(),
            ));
        }
        if self.cache.sweep_interval.is_zero() || self.scheduler.drain_interval.is_zero() {
            return Err(Error::InvalidConfigValue(
                "timer intervals must be positive".to_string(),
            ));
        }
        if self.scheduler.max_queue_wait.is_zero() || self.scheduler.queue_capacity == 0 {
            return Err(Error::InvalidConfigValue(
                "scheduler queue needs capacity and a positive wait limit".to_string(),
            ));
        }
        if self.cache.live_retention < self.cache.equity_live_ttl.max(self.cache.crypto_live_ttl) {
            return Err(Error::InvalidConfigValue(
                "live retention shorter than live TTL".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.live_ttl(AssetCategory::Stock), Duration::from_secs(30));
        assert_eq!(config.cache.live_ttl(AssetCategory::Etf), Duration::from_secs(30));
        assert_eq!(config.cache.live_ttl(AssetCategory::Crypto), Duration::from_secs(15));
        assert_eq!(config.prefetch.universe_size(AssetCategory::Etf), 30);
    }

    #[test]
    fn test_batch_size_range() {
        let mut config = GatewayConfig::default();
        config.prefetch.batch_size = 4;
        assert!(matches!(config.validate(), Err(Error::InvalidConfigValue(_))));

        config.prefetch.batch_size = 10;
        assert!(config.validate().is_ok());

        config.prefetch.batch_size = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = GatewayConfig::default();
        config.cache.live_max_entries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scheduler_wait_limit_must_be_positive() {
        let mut config = GatewayConfig::default();
        config.scheduler.max_queue_wait = Duration::ZERO;
        assert!(matches!(config.validate(), Err(Error::InvalidConfigValue(_))));

        config.scheduler.max_queue_wait = Duration::from_secs(30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"prefetch": {"batchSize": 6}, "routingMode": "BEST_AVAILABLE"}"#)
                .unwrap();
        assert_eq!(config.prefetch.batch_size, 6);
        assert_eq!(config.prefetch.interval, PREFETCH_INTERVAL);
        assert_eq!(config.routing_mode, RoutingMode::BestAvailable);
        assert_eq!(config.cache, CacheConfig::default());
    }
}

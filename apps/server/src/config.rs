use std::str::FromStr;
use std::time::Duration;

use tickerhub_core::constants::{MAX_PREFETCH_BATCH_SIZE, MIN_PREFETCH_BATCH_SIZE};
use tickerhub_core::providers::{ALPHA_VANTAGE_API_KEY, COINGECKO_API_KEY, FINNHUB_API_KEY};
use tickerhub_core::{GatewayConfig, ProviderCredentials};

const PREFETCH_INTERVAL_SECS: &str = "TICKERHUB_PREFETCH_INTERVAL_SECS";
const PREFETCH_BATCH_SIZE: &str = "TICKERHUB_PREFETCH_BATCH_SIZE";
const CACHE_MAX_ENTRIES: &str = "TICKERHUB_CACHE_MAX_ENTRIES";
const DIAGNOSTICS_INTERVAL_SECS: &str = "TICKERHUB_DIAGNOSTICS_INTERVAL_SECS";

const DEFAULT_DIAGNOSTICS_INTERVAL: Duration = Duration::from_secs(300);

pub struct Config {
    pub credentials: ProviderCredentials,
    pub gateway: GatewayConfig,
    pub diagnostics_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let credentials = ProviderCredentials {
            finnhub_api_key: lookup(FINNHUB_API_KEY),
            alpha_vantage_api_key: lookup(ALPHA_VANTAGE_API_KEY),
            coingecko_api_key: lookup(COINGECKO_API_KEY),
        };

        let mut gateway = GatewayConfig::default();
        if let Some(secs) = parse_positive::<u64>(&lookup, PREFETCH_INTERVAL_SECS) {
            gateway.prefetch.interval = Duration::from_secs(secs);
        }
        if let Some(size) = parse_positive::<usize>(&lookup, PREFETCH_BATCH_SIZE) {
            if (MIN_PREFETCH_BATCH_SIZE..=MAX_PREFETCH_BATCH_SIZE).contains(&size) {
                gateway.prefetch.batch_size = size;
            } else {
                tracing::warn!(
                    "{}={} outside {}..={}, using {}",
                    PREFETCH_BATCH_SIZE,
                    size,
                    MIN_PREFETCH_BATCH_SIZE,
                    MAX_PREFETCH_BATCH_SIZE,
                    gateway.prefetch.batch_size
                );
            }
        }
        if let Some(entries) = parse_positive::<usize>(&lookup, CACHE_MAX_ENTRIES) {
            gateway.cache.metadata_max_entries = entries;
            gateway.cache.live_max_entries = entries;
        }

        let diagnostics_interval = parse_positive::<u64>(&lookup, DIAGNOSTICS_INTERVAL_SECS)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_DIAGNOSTICS_INTERVAL);

        Self {
            credentials,
            gateway,
            diagnostics_interval,
        }
    }
}

/// Parse a positive number; anything else is ignored with a warning.
fn parse_positive<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr + PartialOrd + Default + Copy,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Some(value),
        _ => {
            tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
            None
        }
    }
}

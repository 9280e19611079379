use chrono::{DateTime, Utc};
use serde::Serialize;
use tickerhub_market_data::{AssetCategory, AssetMetadata, LiveQuote};

/// Freshness of a cached asset, computed at read time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Live data is current.
    Fresh,
    /// Metadata is current, live data is missing or expired.
    Stale,
    /// Nothing current.
    Fallback,
}

impl CacheStatus {
    /// Derive the status from per-tier freshness (`None` = tier has no entry).
    pub fn derive(metadata_fresh: Option<bool>, live_fresh: Option<bool>) -> Self {
        match (metadata_fresh, live_fresh) {
            (None | Some(true), Some(true)) => Self::Fresh,
            (Some(true), None | Some(false)) => Self::Stale,
            _ => Self::Fallback,
        }
    }
}

/// Snapshot of everything the cache holds for one symbol.
#[derive(Clone, Debug)]
pub struct CachedAsset {
    pub symbol: String,
    pub category: Option<AssetCategory>,
    pub metadata: Option<AssetMetadata>,
    pub live: Option<LiveQuote>,
    /// When the live entry was written.
    pub live_written_at: Option<DateTime<Utc>>,
    pub status: CacheStatus,
}

impl CachedAsset {
    pub fn is_empty(&self) -> bool {
        self.metadata.is_none() && self.live.is_none()
    }
}

/// Store sizes and lifetime counters.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub metadata_entries: usize,
    pub metadata_capacity: usize,
    pub live_entries: usize,
    pub live_capacity: usize,
    pub evictions: u64,
    pub swept: u64,
}

/// Entries removed by one sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub metadata_removed: usize,
    pub live_removed: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.metadata_removed + self.live_removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_rule() {
        assert_eq!(CacheStatus::derive(Some(true), Some(true)), CacheStatus::Fresh);
        assert_eq!(CacheStatus::derive(None, Some(true)), CacheStatus::Fresh);
        assert_eq!(CacheStatus::derive(Some(true), Some(false)), CacheStatus::Stale);
        assert_eq!(CacheStatus::derive(Some(true), None), CacheStatus::Stale);
        assert_eq!(CacheStatus::derive(Some(false), Some(true)), CacheStatus::Fallback);
        assert_eq!(CacheStatus::derive(Some(false), Some(false)), CacheStatus::Fallback);
        assert_eq!(CacheStatus::derive(None, None), CacheStatus::Fallback);
    }

    #[test]
    fn test_status_orders_by_degradation() {
        assert!(CacheStatus::Fresh < CacheStatus::Stale);
        assert!(CacheStatus::Stale < CacheStatus::Fallback);
    }
}

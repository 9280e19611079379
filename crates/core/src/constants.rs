//! Gateway defaults.

use std::time::Duration;

/// Live data TTL for stocks and ETFs.
pub const EQUITY_LIVE_TTL: Duration = Duration::from_secs(30);

/// Live data TTL for crypto assets.
pub const CRYPTO_LIVE_TTL: Duration = Duration::from_secs(15);

/// Metadata changes rarely; keep it for hours.
pub const METADATA_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Age after which the sweep drops a live entry even though it is servable as stale.
pub const LIVE_HARD_RETENTION: Duration = Duration::from_secs(15 * 60);

pub const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub const DEFAULT_MAX_ENTRIES: usize = 5_000;

pub const PREFETCH_INTERVAL: Duration = Duration::from_secs(15 * 60);

pub const PREFETCH_BATCH_SIZE: usize = 8;
pub const MIN_PREFETCH_BATCH_SIZE: usize = 5;
pub const MAX_PREFETCH_BATCH_SIZE: usize = 10;

/// Pause between two prefetch batches.
pub const PREFETCH_BATCH_DELAY: Duration = Duration::from_secs(1);

/// Default universe sizes per category.
pub const STOCK_UNIVERSE_SIZE: usize = 50;
pub const ETF_UNIVERSE_SIZE: usize = 30;
pub const CRYPTO_UNIVERSE_SIZE: usize = 50;

pub const MAX_PAGE_SIZE: usize = 250;
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Source reported by a record that no provider or cache could fill.
pub const NO_SOURCE: &str = "NONE";

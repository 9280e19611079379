use chrono::{DateTime, Utc};
use serde::Serialize;
use tickerhub_market_data::AssetCategory;

/// Where a category's refresh currently is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrefetchPhase {
    #[default]
    Idle,
    /// Writing discovered metadata.
    Metadata,
    /// Fetching live data in batches.
    LiveData,
}

/// Outcome of refreshing one category.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub category: AssetCategory,
    pub targets: usize,
    pub metadata_written: usize,
    pub live_written: usize,
    /// Symbols whose live fetch exhausted every provider.
    pub failed: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Observable per-category prefetch state.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefetchState {
    pub category: AssetCategory,
    pub phase: PrefetchPhase,
    pub cycles: u64,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_report: Option<RefreshReport>,
}

impl PrefetchState {
    pub fn new(category: AssetCategory) -> Self {
        Self {
            category,
            phase: PrefetchPhase::Idle,
            cycles: 0,
            last_started_at: None,
            last_report: None,
        }
    }
}

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tickerhub_market_data::{normalize_symbol, AssetCategory, Capability, RateSnapshot, RoutingMode};

use crate::cache::{CacheStats, CacheStatus, CachedAsset};
use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, NO_SOURCE};
use crate::prefetch::PrefetchState;

/// One asset as served to clients: metadata, live data and freshness.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetView {
    pub symbol: String,
    pub display_name: String,
    pub category: Option<AssetCategory>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub exchange: Option<String>,
    pub country: Option<String>,

    pub price: Decimal,
    pub change_24h: Option<Decimal>,
    pub volume_24h: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub open: Option<Decimal>,
    /// Provider of the live data, `NONE` when there is none.
    pub source: String,
    pub last_updated: Option<DateTime<Utc>>,

    pub status: CacheStatus,
    /// Live data is served past its TTL.
    pub is_stale: bool,
}

impl AssetView {
    /// Zero-value record for a symbol nothing is known about.
    pub fn empty(symbol: &str) -> Self {
        let symbol = normalize_symbol(symbol);
        Self {
            display_name: symbol.clone(),
            symbol,
            category: None,
            sector: None,
            industry: None,
            exchange: None,
            country: None,
            price: Decimal::ZERO,
            change_24h: None,
            volume_24h: None,
            market_cap: None,
            high: None,
            low: None,
            open: None,
            source: NO_SOURCE.to_string(),
            last_updated: None,
            status: CacheStatus::Fallback,
            is_stale: false,
        }
    }

    pub fn from_cached(cached: &CachedAsset) -> Self {
        let mut view = Self::empty(&cached.symbol);
        view.category = cached.category;
        view.status = cached.status;

        if let Some(metadata) = &cached.metadata {
            if !metadata.display_name.is_empty() {
                view.display_name = metadata.display_name.clone();
            }
            view.sector = metadata.sector.clone();
            view.industry = metadata.industry.clone();
            view.exchange = metadata.exchange.clone();
            view.country = metadata.country.clone();
        }

        if let Some(live) = &cached.live {
            view.price = live.price;
            view.change_24h = live.change_24h;
            view.volume_24h = live.volume_24h;
            view.market_cap = live.market_cap;
            view.high = live.high;
            view.low = live.low;
            view.open = live.open;
            view.source = live.source.clone();
            view.last_updated = Some(live.last_updated);
            view.is_stale = cached.status != CacheStatus::Fresh;
        }
        view
    }

    pub fn has_live_data(&self) -> bool {
        self.last_updated.is_some()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    MarketCap,
    Price,
    Change24h,
    Volume,
    Symbol,
    Name,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Paging, filtering and sorting of a category listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageRequest {
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
    /// Case-insensitive filter on symbol or name.
    pub search: Option<String>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search: None,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl PageRequest {
    /// Clamp page to >= 1 and page size to 1..=250; blank searches are dropped.
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        self.search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Slice `all` (already filtered and sorted) into one page.
    pub fn from_sorted(all: Vec<T>, page: usize, page_size: usize) -> Self {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let total = all.len();
        let total_pages = total.div_ceil(page_size);
        let items = all
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();
        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

/// Per-provider view for diagnostics.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDiagnostics {
    pub id: String,
    pub is_demo: bool,
    pub capabilities: Vec<Capability>,
    pub queue_len: usize,
    pub rate: Option<RateSnapshot>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayDiagnostics {
    pub generated_at: DateTime<Utc>,
    pub routing_mode: RoutingMode,
    pub providers: Vec<ProviderDiagnostics>,
    pub chains: BTreeMap<Capability, Vec<String>>,
    pub cache: CacheStats,
    pub prefetch: Vec<PrefetchState>,
}

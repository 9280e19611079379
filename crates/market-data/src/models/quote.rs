use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Normalized live market data for one symbol.
///
/// Every provider adapter converts its own payload into this shape before
/// the quote reaches the router or the cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveQuote {
    /// Gateway symbol (e.g., "AAPL", "BTC")
    pub symbol: String,

    /// Current/last price (required)
    pub price: Decimal,

    /// 24h change in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_24h: Option<Decimal>,

    /// 24h traded volume
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_24h: Option<Decimal>,

    /// Market capitalization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,

    /// Provider that produced the quote (FINNHUB, YAHOO, COINGECKO, ...)
    pub source: String,

    /// When the provider observed the price
    pub last_updated: DateTime<Utc>,
}

impl LiveQuote {
    /// Create a quote with the minimal required fields.
    pub fn new(
        symbol: impl Into<String>,
        price: Decimal,
        source: impl Into<String>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            change_24h: None,
            volume_24h: None,
            market_cap: None,
            high: None,
            low: None,
            open: None,
            source: source.into(),
            last_updated,
        }
    }

    /// Set the day range.
    pub fn with_range(
        mut self,
        open: Option<Decimal>,
        high: Option<Decimal>,
        low: Option<Decimal>,
    ) -> Self {
        self.open = open;
        self.high = high;
        self.low = low;
        self
    }

    pub fn with_change(mut self, change_24h: Option<Decimal>) -> Self {
        self.change_24h = change_24h;
        self
    }

    pub fn with_volume(mut self, volume_24h: Option<Decimal>) -> Self {
        self.volume_24h = volume_24h;
        self
    }

    pub fn with_market_cap(mut self, market_cap: Option<Decimal>) -> Self {
        self.market_cap = market_cap;
        self
    }
}

//! Yahoo Finance market data provider.
//!
//! This provider uses the Yahoo Finance chart API to fetch live quotes for:
//! - Equities/ETFs (e.g., AAPL, SPY, BRK-B)
//! - Cryptocurrencies (e.g., BTC-USD)
//!
//! No credential is needed, which makes Yahoo the always-available middle of
//! most fallback chains.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};
use yahoo_finance_api as yahoo;

use crate::errors::MarketDataError;
use crate::models::{AssetCategory, LiveQuote};
use crate::provider::{
    Capability, MarketDataProvider, PriorityClass, ProviderCapabilities, ProviderConfig,
    QuoteNormalizer,
};

pub const PROVIDER_ID: &str = "YAHOO";

/// One daily bar from the chart API.
#[derive(Clone, Debug, Deserialize)]
pub struct ChartBar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// The last few daily bars of a symbol, oldest first.
///
/// The newest bar carries the live price; the one before it gives the
/// previous close for the 24h change.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChartSnapshot {
    pub bars: Vec<ChartBar>,
}

impl From<yahoo::Quote> for ChartBar {
    fn from(quote: yahoo::Quote) -> Self {
        Self {
            timestamp: quote.timestamp as i64,
            open: quote.open,
            high: quote.high,
            low: quote.low,
            close: quote.close,
            volume: quote.volume,
        }
    }
}

// ============================================================================
// Yahoo Provider
// ============================================================================

/// Yahoo Finance market data provider.
pub struct YahooProvider {
    connector: yahoo::YahooConnector,
    config: ProviderConfig,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider.
    pub fn new() -> Result<Self, MarketDataError> {
        let connector = yahoo::YahooConnector::new().map_err(|e| {
            MarketDataError::provider(
                PROVIDER_ID,
                format!("Failed to initialize Yahoo connector: {}", e),
            )
        })?;
        Ok(Self {
            connector,
            config: Self::default_config(),
        })
    }

    /// Unofficial endpoint; the limits are conservative guesses that keep
    /// Yahoo from answering 429.
    pub fn default_config() -> ProviderConfig {
        ProviderConfig::new(PROVIDER_ID)
            .with_windows(100, 2_000, 20_000)
            .with_burst(10)
            .with_cooldown(Duration::from_millis(250))
            .with_retry(2, Duration::from_millis(500))
            .with_priority(PriorityClass::Normal)
    }

    /// Translate a gateway symbol into Yahoo's ticker format.
    ///
    /// Crypto trades against USD (`BTC` -> `BTC-USD`) and share classes use a
    /// dash (`BRK.B` -> `BRK-B`).
    pub fn provider_symbol(symbol: &str, category: AssetCategory) -> String {
        match category {
            AssetCategory::Crypto if symbol.contains('-') => symbol.to_string(),
            AssetCategory::Crypto => format!("{}-USD", symbol),
            AssetCategory::Stock | AssetCategory::Etf => symbol.replace('.', "-"),
        }
    }

    async fn fetch_snapshot(&self, yahoo_symbol: &str) -> Result<ChartSnapshot, MarketDataError> {
        debug!("Yahoo chart request for {}", yahoo_symbol);

        let response = self
            .connector
            .get_quote_range(yahoo_symbol, "1d", "5d")
            .await
            .map_err(|e| map_yahoo_error(yahoo_symbol, e))?;

        let quotes = response.quotes().map_err(|e| {
            warn!("No quotes returned for {}: {}", yahoo_symbol, e);
            MarketDataError::SymbolNotFound(yahoo_symbol.to_string())
        })?;

        Ok(ChartSnapshot {
            bars: quotes.into_iter().map(ChartBar::from).collect(),
        })
    }
}

impl QuoteNormalizer for YahooProvider {
    type Raw = ChartSnapshot;

    fn normalize_quote(&self, symbol: &str, raw: ChartSnapshot) -> Result<LiveQuote, MarketDataError> {
        let mut bars = raw.bars;
        bars.sort_by_key(|bar| bar.timestamp);

        let latest = bars
            .last()
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let timestamp = Utc
            .timestamp_opt(latest.timestamp, 0)
            .single()
            .ok_or_else(|| MarketDataError::ValidationFailed {
                message: format!("Invalid timestamp: {}", latest.timestamp),
            })?;

        let price = Decimal::from_f64_retain(latest.close).ok_or_else(|| {
            MarketDataError::ValidationFailed {
                message: format!("Failed to convert close price {} to Decimal", latest.close),
            }
        })?;

        let change = bars
            .len()
            .checked_sub(2)
            .and_then(|i| Decimal::from_f64_retain(bars[i].close))
            .filter(|prev| !prev.is_zero())
            .map(|prev| ((price - prev) / prev * Decimal::ONE_HUNDRED).round_dp(4));

        Ok(LiveQuote::new(symbol, price, PROVIDER_ID, timestamp)
            .with_range(
                Decimal::from_f64_retain(latest.open),
                Decimal::from_f64_retain(latest.high),
                Decimal::from_f64_retain(latest.low),
            )
            .with_change(change)
            .with_volume(Decimal::from_u64(latest.volume)))
    }
}

// ============================================================================
// MarketDataProvider Implementation
// ============================================================================

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            capabilities: &[Capability::EquityQuote, Capability::CryptoQuote],
            supports_discovery: false,
        }
    }

    async fn get_quote(
        &self,
        symbol: &str,
        category: AssetCategory,
    ) -> Result<LiveQuote, MarketDataError> {
        let yahoo_symbol = Self::provider_symbol(symbol, category);
        let snapshot = self.fetch_snapshot(&yahoo_symbol).await?;
        self.normalize_quote(symbol, snapshot)
    }
}

fn map_yahoo_error(symbol: &str, error: yahoo::YahooError) -> MarketDataError {
    match error {
        yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult => {
            MarketDataError::SymbolNotFound(symbol.to_string())
        }
        other => {
            let message = other.to_string();
            if message.contains("429") || message.contains("Too Many Requests") {
                MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::provider(PROVIDER_ID, message)
            }
        }
    }
}

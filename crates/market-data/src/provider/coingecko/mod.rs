//! CoinGecko market data provider implementation.
//!
//! This module provides digital asset data from the CoinGecko API:
//! - Live quotes and profiles via the /coins/markets endpoint
//! - Discovery of the top coins by market cap (same endpoint, paged)
//!
//! CoinGecko addresses coins by id ("bitcoin"), not ticker ("BTC"). A small
//! built-in table covers the majors; every discovery call teaches the
//! provider more ticker -> id mappings.
//! API documentation: https://docs.coingecko.com/reference/coins-markets

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{normalize_symbol, AssetCategory, AssetMetadata, LiveQuote};
use crate::provider::{
    Capability, MarketDataProvider, PriorityClass, ProviderCapabilities, ProviderConfig,
    QuoteNormalizer,
};

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const PROVIDER_ID: &str = "COINGECKO";

/// Limits divisor for the keyless public endpoint.
const DEMO_FACTOR: u32 = 3;

/// Largest page /coins/markets accepts.
const MAX_PAGE_SIZE: usize = 250;

/// Ticker -> CoinGecko id for coins that are always asked for.
const KNOWN_COIN_IDS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("USDT", "tether"),
    ("BNB", "binancecoin"),
    ("SOL", "solana"),
    ("XRP", "ripple"),
    ("USDC", "usd-coin"),
    ("ADA", "cardano"),
    ("DOGE", "dogecoin"),
    ("TRX", "tron"),
    ("AVAX", "avalanche-2"),
    ("DOT", "polkadot"),
    ("LINK", "chainlink"),
    ("MATIC", "matic-network"),
    ("LTC", "litecoin"),
    ("BCH", "bitcoin-cash"),
    ("XLM", "stellar"),
    ("ATOM", "cosmos"),
    ("UNI", "uniswap"),
    ("SHIB", "shiba-inu"),
];

// ============================================================================
// API Response Structures
// ============================================================================

/// One row of /coins/markets.
#[derive(Clone, Debug, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub total_volume: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

// ============================================================================
// CoinGeckoProvider
// ============================================================================

/// CoinGecko market data provider.
///
/// Works without a key against the public endpoint at reduced limits.
pub struct CoinGeckoProvider {
    client: Client,
    api_key: Option<String>,
    config: ProviderConfig,
    coin_ids: RwLock<HashMap<String, String>>,
}

impl CoinGeckoProvider {
    pub fn new(api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        let config = if api_key.is_some() {
            Self::default_config()
        } else {
            Self::default_config().demo(DEMO_FACTOR)
        };

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        let coin_ids = KNOWN_COIN_IDS
            .iter()
            .map(|(ticker, id)| (ticker.to_string(), id.to_string()))
            .collect();

        Self {
            client,
            api_key,
            config,
            coin_ids: RwLock::new(coin_ids),
        }
    }

    /// Limits for the free "demo" key tier.
    pub fn default_config() -> ProviderConfig {
        ProviderConfig::new(PROVIDER_ID)
            .with_windows(30, 500, 10_000)
            .with_burst(5)
            .with_cooldown(Duration::from_secs(2))
            .with_retry(2, Duration::from_secs(1))
            .with_priority(PriorityClass::High)
    }

    fn read_ids(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.coin_ids.read().unwrap_or_else(|poisoned| {
            warn!("CoinGecko id table lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_ids(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.coin_ids.write().unwrap_or_else(|poisoned| {
            warn!("CoinGecko id table lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// CoinGecko id for a ticker. Unknown tickers are tried lower-cased,
    /// which matches many smaller coins.
    pub fn coin_id(&self, symbol: &str) -> String {
        self.read_ids()
            .get(&normalize_symbol(symbol))
            .cloned()
            .unwrap_or_else(|| symbol.trim().to_lowercase())
    }

    fn learn_ids(&self, markets: &[CoinMarket]) {
        let mut ids = self.write_ids();
        for market in markets {
            // First (highest market cap) coin keeps a contested ticker
            ids.entry(normalize_symbol(&market.symbol))
                .or_insert_with(|| market.id.clone());
        }
    }

    async fn fetch(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let url = format!("{}{}", BASE_URL, endpoint);

        let mut request = self.client.get(&url).query(params);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::provider(PROVIDER_ID, format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        debug!("CoinGecko {} -> {}", endpoint, status);

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(ErrorResponse { error: Some(msg) }) = serde_json::from_str(&body) {
                return Err(MarketDataError::provider(PROVIDER_ID, msg));
            }
            return Err(MarketDataError::provider(
                PROVIDER_ID,
                format!("HTTP {} - {}", status, body),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| MarketDataError::provider(PROVIDER_ID, format!("Failed to read response: {}", e)))
    }

    async fn fetch_markets(&self, params: &[(&str, &str)]) -> Result<Vec<CoinMarket>, MarketDataError> {
        let mut all_params = vec![("vs_currency", "usd"), ("order", "market_cap_desc")];
        all_params.extend_from_slice(params);

        let text = self.fetch("/coins/markets", &all_params).await?;
        parse_markets(&text)
    }

    /// Market row for a single ticker.
    async fn fetch_market(&self, symbol: &str) -> Result<CoinMarket, MarketDataError> {
        let id = self.coin_id(symbol);
        self.fetch_markets(&[("ids", id.as_str())])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))
    }
}

impl QuoteNormalizer for CoinGeckoProvider {
    type Raw = CoinMarket;

    fn normalize_quote(&self, symbol: &str, raw: CoinMarket) -> Result<LiveQuote, MarketDataError> {
        let price = raw
            .current_price
            .and_then(|p| Decimal::try_from(p).ok())
            .ok_or_else(|| MarketDataError::ValidationFailed {
                message: format!("CoinGecko returned no price for {}", raw.id),
            })?;

        Ok(
            LiveQuote::new(symbol, price, PROVIDER_ID, raw.last_updated.unwrap_or_else(Utc::now))
                .with_range(None, to_decimal(raw.high_24h), to_decimal(raw.low_24h))
                .with_change(to_decimal(raw.price_change_percentage_24h))
                .with_volume(to_decimal(raw.total_volume))
                .with_market_cap(to_decimal(raw.market_cap)),
        )
    }
}

// ============================================================================
// MarketDataProvider trait implementation
// ============================================================================

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            capabilities: &[Capability::CryptoQuote, Capability::CryptoProfile],
            supports_discovery: true,
        }
    }

    fn is_demo(&self) -> bool {
        self.api_key.is_none()
    }

    async fn get_quote(
        &self,
        symbol: &str,
        category: AssetCategory,
    ) -> Result<LiveQuote, MarketDataError> {
        if category != AssetCategory::Crypto {
            return Err(MarketDataError::UnsupportedAssetType(category.to_string()));
        }
        let market = self.fetch_market(symbol).await?;
        self.normalize_quote(symbol, market)
    }

    async fn get_profile(
        &self,
        symbol: &str,
        category: AssetCategory,
    ) -> Result<AssetMetadata, MarketDataError> {
        if category != AssetCategory::Crypto {
            return Err(MarketDataError::UnsupportedAssetType(category.to_string()));
        }
        let market = self.fetch_market(symbol).await?;
        Ok(market_to_metadata(&market))
    }

    async fn discover(
        &self,
        category: AssetCategory,
        limit: usize,
    ) -> Result<Vec<AssetMetadata>, MarketDataError> {
        if category != AssetCategory::Crypto {
            return Err(MarketDataError::NotSupported {
                operation: format!("discover {}", category),
                provider: PROVIDER_ID.to_string(),
            });
        }

        let per_page = limit.clamp(1, MAX_PAGE_SIZE).to_string();
        let markets = self
            .fetch_markets(&[("per_page", per_page.as_str()), ("page", "1")])
            .await?;

        self.learn_ids(&markets);
        debug!("CoinGecko discovered {} coins", markets.len());

        Ok(markets.iter().take(limit).map(market_to_metadata).collect())
    }
}

fn parse_markets(text: &str) -> Result<Vec<CoinMarket>, MarketDataError> {
    serde_json::from_str(text).map_err(|e| {
        MarketDataError::provider(PROVIDER_ID, format!("Failed to parse markets response: {}", e))
    })
}

fn market_to_metadata(market: &CoinMarket) -> AssetMetadata {
    AssetMetadata::new(
        normalize_symbol(&market.symbol),
        market.name.clone(),
        AssetCategory::Crypto,
        market.last_updated.unwrap_or_else(Utc::now),
    )
}

fn to_decimal(value: Option<f64>) -> Option<Decimal> {
    value.and_then(|v| Decimal::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const MARKETS_JSON: &str = r#"[
        {
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "current_price": 42150.5,
            "market_cap": 826000000000,
            "total_volume": 21000000000,
            "high_24h": 42800,
            "low_24h": 41200,
            "price_change_percentage_24h": 1.25,
            "last_updated": "2024-01-01T12:00:00.000Z"
        },
        {
            "id": "wrapped-newcoin",
            "symbol": "wnc",
            "name": "Wrapped Newcoin",
            "current_price": 0.5,
            "market_cap": null,
            "total_volume": null,
            "high_24h": null,
            "low_24h": null,
            "price_change_percentage_24h": null,
            "last_updated": null
        }
    ]"#;

    #[test]
    fn test_keyless_provider_is_demo() {
        let provider = CoinGeckoProvider::new(None);
        assert!(provider.is_demo());
        assert_eq!(provider.config().requests_per_minute, 10);

        let keyed = CoinGeckoProvider::new(Some("CG-key".to_string()));
        assert!(!keyed.is_demo());
        assert_eq!(keyed.config().requests_per_minute, 30);
    }

    #[test]
    fn test_capabilities() {
        let caps = CoinGeckoProvider::new(None).capabilities();
        assert!(caps.supports(Capability::CryptoQuote));
        assert!(caps.supports(Capability::CryptoProfile));
        assert!(!caps.supports(Capability::EquityQuote));
        assert!(caps.supports_discovery);
    }

    #[test]
    fn test_coin_id_lookup() {
        let provider = CoinGeckoProvider::new(None);
        assert_eq!(provider.coin_id("btc"), "bitcoin");
        assert_eq!(provider.coin_id("AVAX"), "avalanche-2");
        assert_eq!(provider.coin_id("PEPE"), "pepe");
    }

    #[test]
    fn test_learn_ids_from_discovery() {
        let provider = CoinGeckoProvider::new(None);
        let markets = parse_markets(MARKETS_JSON).unwrap();
        provider.learn_ids(&markets);
        assert_eq!(provider.coin_id("WNC"), "wrapped-newcoin");
        assert_eq!(provider.coin_id("BTC"), "bitcoin");
    }

    #[test]
    fn test_normalize_quote() {
        let provider = CoinGeckoProvider::new(None);
        let market = parse_markets(MARKETS_JSON).unwrap().remove(0);
        let quote = provider.normalize_quote("BTC", market).unwrap();

        assert_eq!(quote.symbol, "BTC");
        assert_eq!(quote.price, dec!(42150.5));
        assert_eq!(quote.market_cap, Some(dec!(826000000000)));
        assert_eq!(quote.volume_24h, Some(dec!(21000000000)));
        assert_eq!(quote.high, Some(dec!(42800)));
        assert_eq!(quote.change_24h, Some(dec!(1.25)));
        assert_eq!(quote.source, "COINGECKO");
        assert_eq!(quote.last_updated.timestamp(), 1704110400);
    }

    #[test]
    fn test_normalize_without_price_fails_validation() {
        let provider = CoinGeckoProvider::new(None);
        let mut market = parse_markets(MARKETS_JSON).unwrap().remove(1);
        market.current_price = None;
        let err = provider.normalize_quote("WNC", market).unwrap_err();
        assert!(matches!(err, MarketDataError::ValidationFailed { .. }));
    }

    #[test]
    fn test_market_to_metadata_uppercases_symbol() {
        let market = parse_markets(MARKETS_JSON).unwrap().remove(0);
        let metadata = market_to_metadata(&market);
        assert_eq!(metadata.symbol, "BTC");
        assert_eq!(metadata.display_name, "Bitcoin");
        assert_eq!(metadata.category, AssetCategory::Crypto);
    }
}

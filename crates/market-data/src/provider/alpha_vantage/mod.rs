//! Alpha Vantage market data provider implementation.
//!
//! This module provides market data from Alpha Vantage API:
//! - Equity quotes via the GLOBAL_QUOTE endpoint
//! - Company profiles via the OVERVIEW endpoint
//!
//! Note: Alpha Vantage free tier is limited to 5 API calls per minute and
//! 25 per day. Without a key the provider runs against the public `demo` key
//! with even lower limits.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{AssetCategory, AssetMetadata, LiveQuote};
use crate::provider::{
    Capability, MarketDataProvider, PriorityClass, ProviderCapabilities, ProviderConfig,
    QuoteNormalizer,
};

const BASE_URL: &str = "https://www.alphavantage.co/query";
pub const PROVIDER_ID: &str = "ALPHA_VANTAGE";

/// Public key Alpha Vantage accepts for a handful of sample symbols.
pub const DEMO_API_KEY: &str = "demo";

/// Limits divisor applied when running on the demo key.
const DEMO_FACTOR: u32 = 5;

// ============================================================================
// API Response Structures
// ============================================================================

/// GLOBAL_QUOTE response wrapper.
///
/// Errors and throttling notices come back with HTTP 200 in the same
/// envelope, so they are parsed alongside the payload.
#[derive(Debug, Deserialize)]
pub struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "02. open")]
    open: Option<String>,
    #[serde(rename = "03. high")]
    high: Option<String>,
    #[serde(rename = "04. low")]
    low: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "07. latest trading day")]
    latest_trading_day: Option<String>,
    /// e.g. "1.0117%"
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

/// OVERVIEW response for company fundamentals
/// Only includes fields that map to AssetMetadata; API returns many more fields.
#[derive(Debug, Deserialize)]
struct CompanyOverviewResponse {
    #[serde(rename = "Symbol")]
    symbol: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Exchange")]
    exchange: Option<String>,
    #[serde(rename = "Country")]
    country: Option<String>,
    #[serde(rename = "Sector")]
    sector: Option<String>,
    #[serde(rename = "Industry")]
    industry: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

/// Alpha Vantage market data provider.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    config: ProviderConfig,
    demo: bool,
}

impl AlphaVantageProvider {
    /// Create a provider. `None` falls back to the public demo key with
    /// reduced limits.
    pub fn new(api_key: Option<String>) -> Self {
        let (api_key, demo) = match api_key {
            Some(key) if !key.trim().is_empty() => (key, false),
            _ => (DEMO_API_KEY.to_string(), true),
        };

        let config = if demo {
            Self::default_config().demo(DEMO_FACTOR)
        } else {
            Self::default_config()
        };

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            config,
            demo,
        }
    }

    /// Free-tier limits.
    pub fn default_config() -> ProviderConfig {
        ProviderConfig::new(PROVIDER_ID)
            .with_windows(5, 300, 25)
            .with_burst(1)
            .with_cooldown(Duration::from_secs(12))
            .with_retry(1, Duration::from_secs(2))
            .with_priority(PriorityClass::Low)
    }

    /// Make a request to the Alpha Vantage API.
    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", &self.api_key));

        let url = reqwest::Url::parse_with_params(BASE_URL, &all_params).map_err(|e| {
            MarketDataError::provider(PROVIDER_ID, format!("Failed to build URL: {}", e))
        })?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(&self.api_key, "***")
        );

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::provider(PROVIDER_ID, e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            return Err(MarketDataError::provider(PROVIDER_ID, format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| MarketDataError::provider(PROVIDER_ID, e.to_string()))
    }

    /// Map the in-band error fields Alpha Vantage returns with HTTP 200.
    fn check_api_error(
        error_message: &Option<String>,
        note: &Option<String>,
        information: &Option<String>,
    ) -> Result<(), MarketDataError> {
        if let Some(msg) = error_message {
            if msg.contains("Invalid API call") || msg.contains("not found") {
                return Err(MarketDataError::SymbolNotFound(msg.clone()));
            }
            return Err(MarketDataError::provider(PROVIDER_ID, msg.clone()));
        }

        for msg in [note, information].into_iter().flatten() {
            if is_throttle_notice(msg) {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                });
            }
            warn!("Alpha Vantage notice: {}", msg);
        }

        Ok(())
    }

    fn parse_overview(
        symbol: &str,
        category: AssetCategory,
        text: &str,
    ) -> Result<AssetMetadata, MarketDataError> {
        let response: CompanyOverviewResponse = serde_json::from_str(text).map_err(|e| {
            MarketDataError::provider(
                PROVIDER_ID,
                format!("Failed to parse company overview response: {}", e),
            )
        })?;

        Self::check_api_error(&response.error_message, &response.note, &response.information)?;

        let name = match (response.symbol, response.name) {
            (Some(_), Some(name)) if !name.is_empty() => name,
            _ => return Err(MarketDataError::SymbolNotFound(symbol.to_string())),
        };

        let mut metadata = AssetMetadata::new(symbol, name, category, Utc::now());
        metadata.sector = response.sector.filter(|s| !is_none_marker(s));
        metadata.industry = response.industry.filter(|s| !is_none_marker(s));
        metadata.exchange = response.exchange.filter(|s| !is_none_marker(s));
        metadata.country = response.country.filter(|s| !is_none_marker(s));
        Ok(metadata)
    }
}

impl QuoteNormalizer for AlphaVantageProvider {
    type Raw = GlobalQuoteResponse;

    fn normalize_quote(
        &self,
        symbol: &str,
        raw: GlobalQuoteResponse,
    ) -> Result<LiveQuote, MarketDataError> {
        Self::check_api_error(&raw.error_message, &raw.note, &raw.information)?;

        // Unknown symbols yield an empty "Global Quote" object
        let quote = raw.global_quote.unwrap_or_default();
        let price = parse_decimal(&quote.price)
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let last_updated = quote
            .latest_trading_day
            .as_deref()
            .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .and_then(|dt| Utc.from_local_datetime(&dt).single())
            .unwrap_or_else(Utc::now);

        let change = quote
            .change_percent
            .as_deref()
            .and_then(|s| Decimal::from_str(s.trim_end_matches('%')).ok());

        Ok(LiveQuote::new(symbol, price, PROVIDER_ID, last_updated)
            .with_range(
                parse_decimal(&quote.open),
                parse_decimal(&quote.high),
                parse_decimal(&quote.low),
            )
            .with_change(change)
            .with_volume(parse_decimal(&quote.volume)))
    }
}

// ============================================================================
// MarketDataProvider trait implementation
// ============================================================================

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            capabilities: &[Capability::EquityQuote, Capability::EquityProfile],
            supports_discovery: false,
        }
    }

    fn is_demo(&self) -> bool {
        self.demo
    }

    async fn get_quote(
        &self,
        symbol: &str,
        category: AssetCategory,
    ) -> Result<LiveQuote, MarketDataError> {
        if !category.is_equity() {
            return Err(MarketDataError::UnsupportedAssetType(category.to_string()));
        }

        let text = self
            .fetch(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol)])
            .await?;
        let raw: GlobalQuoteResponse = serde_json::from_str(&text).map_err(|e| {
            MarketDataError::provider(PROVIDER_ID, format!("Failed to parse quote response: {}", e))
        })?;
        self.normalize_quote(symbol, raw)
    }

    async fn get_profile(
        &self,
        symbol: &str,
        category: AssetCategory,
    ) -> Result<AssetMetadata, MarketDataError> {
        if !category.is_equity() {
            return Err(MarketDataError::UnsupportedAssetType(category.to_string()));
        }

        let text = self
            .fetch(&[("function", "OVERVIEW"), ("symbol", symbol)])
            .await?;
        Self::parse_overview(symbol, category, &text)
    }
}

fn is_throttle_notice(msg: &str) -> bool {
    msg.contains("API call frequency")
        || msg.contains("rate limit")
        || msg.contains("requests per day")
}

/// Alpha Vantage writes "None" or "-" for missing values.
fn is_none_marker(value: &str) -> bool {
    value.is_empty() || value == "None" || value == "-"
}

fn parse_decimal(value: &Option<String>) -> Option<Decimal> {
    value
        .as_deref()
        .filter(|s| !is_none_marker(s))
        .and_then(|s| Decimal::from_str(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_key_uses_demo_limits() {
        let provider = AlphaVantageProvider::new(None);
        assert!(provider.is_demo());
        assert_eq!(provider.config().requests_per_minute, 1);
        assert_eq!(provider.config().requests_per_day, 5);
        assert_eq!(provider.config().cooldown, Duration::from_secs(60));
    }

    #[test]
    fn test_blank_key_is_demo() {
        assert!(AlphaVantageProvider::new(Some("  ".to_string())).is_demo());
        assert!(!AlphaVantageProvider::new(Some("abc".to_string())).is_demo());
    }

    #[test]
    fn test_provider_capabilities() {
        let provider = AlphaVantageProvider::new(Some("key".to_string()));
        let caps = provider.capabilities();
        assert!(caps.supports(Capability::EquityQuote));
        assert!(!caps.supports(Capability::CryptoQuote));
        assert_eq!(provider.config().priority_class, PriorityClass::Low);
    }

    #[test]
    fn test_normalize_global_quote() {
        let json = r#"{
            "Global Quote": {
                "01. symbol": "IBM",
                "02. open": "181.0000",
                "03. high": "183.5000",
                "04. low": "180.2500",
                "05. price": "182.9100",
                "06. volume": "3950219",
                "07. latest trading day": "2024-01-12",
                "08. previous close": "181.0800",
                "09. change": "1.8300",
                "10. change percent": "1.0106%"
            }
        }"#;

        let provider = AlphaVantageProvider::new(Some("key".to_string()));
        let raw: GlobalQuoteResponse = serde_json::from_str(json).unwrap();
        let quote = provider.normalize_quote("IBM", raw).unwrap();

        assert_eq!(quote.price, dec!(182.91));
        assert_eq!(quote.high, Some(dec!(183.5)));
        assert_eq!(quote.volume_24h, Some(dec!(3950219)));
        assert_eq!(quote.change_24h, Some(dec!(1.0106)));
        assert_eq!(quote.source, "ALPHA_VANTAGE");
        assert_eq!(quote.last_updated.date_naive().to_string(), "2024-01-12");
    }

    #[test]
    fn test_empty_global_quote_is_not_found() {
        let provider = AlphaVantageProvider::new(None);
        let raw: GlobalQuoteResponse = serde_json::from_str(r#"{"Global Quote": {}}"#).unwrap();
        let err = provider.normalize_quote("ZZZ", raw).unwrap_err();
        assert!(matches!(err, MarketDataError::SymbolNotFound(_)));
    }

    #[test]
    fn test_frequency_note_is_rate_limit() {
        let json = r#"{
            "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute and 500 calls per day."
        }"#;

        let provider = AlphaVantageProvider::new(None);
        let raw: GlobalQuoteResponse = serde_json::from_str(json).unwrap();
        let err = provider.normalize_quote("IBM", raw).unwrap_err();
        assert!(err.is_rate_limit());
    }

    #[test]
    fn test_invalid_call_is_not_found() {
        let result = AlphaVantageProvider::check_api_error(
            &Some("Invalid API call. Please retry or visit the documentation".to_string()),
            &None,
            &None,
        );
        assert!(matches!(result, Err(MarketDataError::SymbolNotFound(_))));
    }

    #[test]
    fn test_parse_overview() {
        let json = r#"{
            "Symbol": "IBM",
            "AssetType": "Common Stock",
            "Name": "International Business Machines",
            "Exchange": "NYSE",
            "Country": "USA",
            "Sector": "TECHNOLOGY",
            "Industry": "COMPUTER & OFFICE EQUIPMENT",
            "MarketCapitalization": "167000000000"
        }"#;

        let metadata =
            AlphaVantageProvider::parse_overview("IBM", AssetCategory::Stock, json).unwrap();
        assert_eq!(metadata.display_name, "International Business Machines");
        assert_eq!(metadata.exchange.as_deref(), Some("NYSE"));
        assert_eq!(metadata.sector.as_deref(), Some("TECHNOLOGY"));
    }

    #[test]
    fn test_parse_overview_drops_none_markers() {
        let json = r#"{"Symbol": "SPY", "Name": "SPDR S&P 500", "Sector": "None", "Industry": "-"}"#;
        let metadata =
            AlphaVantageProvider::parse_overview("SPY", AssetCategory::Etf, json).unwrap();
        assert_eq!(metadata.sector, None);
        assert_eq!(metadata.industry, None);
    }
}

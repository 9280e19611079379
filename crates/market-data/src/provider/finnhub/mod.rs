//! Finnhub market data provider implementation.
//!
//! This module provides market data from Finnhub API:
//! - Equity quotes via the /quote endpoint
//! - Company profiles via the /stock/profile2 endpoint
//!
//! Finnhub free tier is limited to 60 API calls per minute.
//! API documentation: https://finnhub.io/docs/api

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{AssetCategory, AssetMetadata, LiveQuote};
use crate::provider::{
    Capability, MarketDataProvider, PriorityClass, ProviderCapabilities, ProviderConfig,
    QuoteNormalizer,
};

const BASE_URL: &str = "https://finnhub.io/api/v1";
pub const PROVIDER_ID: &str = "FINNHUB";

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from /quote endpoint
#[derive(Debug, Deserialize)]
pub struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    /// Percent change from previous close
    dp: Option<f64>,
    /// High price of the day
    h: Option<f64>,
    /// Low price of the day
    l: Option<f64>,
    /// Open price of the day
    o: Option<f64>,
    /// Timestamp (Unix)
    t: Option<i64>,
}

/// Response from /stock/profile2 endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    name: Option<String>,
    ticker: Option<String>,
    exchange: Option<String>,
    /// Finnhub industry classification
    finnhub_industry: Option<String>,
    country: Option<String>,
}

/// Error response from Finnhub
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

// ============================================================================
// FinnhubProvider
// ============================================================================

/// Finnhub market data provider.
///
/// Equities only. Has no public demo key, so it is only registered when
/// `FINNHUB_API_KEY` is configured.
pub struct FinnhubProvider {
    client: Client,
    api_key: String,
    config: ProviderConfig,
}

impl FinnhubProvider {
    pub fn new(api_key: String) -> Self {
        let config = Self::default_config();
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            config,
        }
    }

    /// Free-tier limits.
    pub fn default_config() -> ProviderConfig {
        ProviderConfig::new(PROVIDER_ID)
            .with_windows(60, 3_600, 86_400)
            .with_burst(5)
            .with_cooldown(Duration::from_secs(1))
            .with_retry(2, Duration::from_millis(500))
            .with_priority(PriorityClass::High)
    }

    /// Make a GET request to the Finnhub API.
    async fn fetch(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let url = format!("{}{}", BASE_URL, endpoint);

        let response = self
            .client
            .get(&url)
            .header("X-Finnhub-Token", &self.api_key)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MarketDataError::Timeout {
                        provider: PROVIDER_ID.to_string(),
                    }
                } else {
                    MarketDataError::provider(PROVIDER_ID, format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        debug!("Finnhub {} -> {}", endpoint, status);

        // 403 is what Finnhub answers once the key's quota is spent
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(MarketDataError::provider(
                PROVIDER_ID,
                "Invalid or missing API key",
            ));
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

    fn parse_profile(
        symbol: &str,
        category: AssetCategory,
        text: &str,
    ) -> Result<AssetMetadata, MarketDataError> {
        let profile: ProfileResponse = serde_json::from_str(text).map_err(|e| {
            MarketDataError::provider(PROVIDER_ID, format!("Failed to parse profile response: {}", e))
        })?;

        // Unknown tickers come back as an empty object
        let name = match (profile.name, profile.ticker) {
            (Some(name), _) if !name.is_empty() => name,
            (_, Some(ticker)) if !ticker.is_empty() => ticker,
            _ => return Err(MarketDataError::SymbolNotFound(symbol.to_string())),
        };

        let mut metadata = AssetMetadata::new(symbol, name, category, Utc::now());
        metadata.industry = profile.finnhub_industry.clone();
        metadata.sector = profile.finnhub_industry;
        metadata.exchange = profile.exchange;
        metadata.country = profile.country;
        Ok(metadata)
    }
}

impl QuoteNormalizer for FinnhubProvider {
    type Raw = QuoteResponse;

    fn normalize_quote(&self, symbol: &str, raw: QuoteResponse) -> Result<LiveQuote, MarketDataError> {
        let close = raw
            .c
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        // Finnhub returns zeros for unknown symbols instead of an error
        if close == 0.0 && raw.o.unwrap_or(0.0) == 0.0 {
            return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
        }

        let price = Decimal::try_from(close).map_err(|_| MarketDataError::ValidationFailed {
            message: format!("Invalid close price: {}", close),
        })?;

        let timestamp = raw
            .t
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(Utc::now);

        Ok(LiveQuote::new(symbol, price, PROVIDER_ID, timestamp)
            .with_range(to_decimal(raw.o), to_decimal(raw.h), to_decimal(raw.l))
            .with_change(to_decimal(raw.dp)))
    }
}

// ============================================================================
// MarketDataProvider trait implementation
// ============================================================================

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
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

    async fn get_quote(
        &self,
        symbol: &str,
        category: AssetCategory,
    ) -> Result<LiveQuote, MarketDataError> {
        if !category.is_equity() {
            return Err(MarketDataError::UnsupportedAssetType(format!(
                "Finnhub free tier does not serve {}",
                category
            )));
        }

        let text = self.fetch("/quote", &[("symbol", symbol)]).await?;
        let raw: QuoteResponse = serde_json::from_str(&text).map_err(|e| {
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
        let text = self.fetch("/stock/profile2", &[("symbol", symbol)]).await?;
        Self::parse_profile(symbol, category, &text)
    }
}

fn to_decimal(value: Option<f64>) -> Option<Decimal> {
    value.and_then(|v| Decimal::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn provider() -> FinnhubProvider {
        FinnhubProvider::new("test_key".to_string())
    }

    #[test]
    fn test_provider_id() {
        assert_eq!(provider().id(), "FINNHUB");
    }

    #[test]
    fn test_provider_capabilities() {
        let caps = provider().capabilities();
        assert!(caps.supports(Capability::EquityQuote));
        assert!(caps.supports(Capability::EquityProfile));
        assert!(!caps.supports(Capability::CryptoQuote));
        assert!(!caps.supports_discovery);
    }

    #[test]
    fn test_default_config() {
        let config = provider().config().clone();
        assert_eq!(config.requests_per_minute, 60);
        assert_eq!(config.priority_class, PriorityClass::High);
        assert_eq!(config.cooldown, Duration::from_secs(1));
    }

    #[test]
    fn test_normalize_quote() {
        let json = r#"{
            "c": 150.25,
            "d": 1.50,
            "dp": 1.01,
            "h": 152.00,
            "l": 148.50,
            "o": 149.00,
            "pc": 148.75,
            "t": 1704067200
        }"#;

        let raw: QuoteResponse = serde_json::from_str(json).unwrap();
        let quote = provider().normalize_quote("AAPL", raw).unwrap();

        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, dec!(150.25));
        assert_eq!(quote.high, Some(dec!(152)));
        assert_eq!(quote.low, Some(dec!(148.5)));
        assert_eq!(quote.change_24h, Some(dec!(1.01)));
        assert_eq!(quote.volume_24h, None);
        assert_eq!(quote.source, "FINNHUB");
        assert_eq!(quote.last_updated.timestamp(), 1704067200);
    }

    #[test]
    fn test_normalize_unknown_symbol() {
        let json = r#"{"c": 0, "d": null, "dp": null, "h": 0, "l": 0, "o": 0, "pc": 0, "t": 0}"#;

        let raw: QuoteResponse = serde_json::from_str(json).unwrap();
        let err = provider().normalize_quote("ZZZ", raw).unwrap_err();
        assert!(matches!(err, MarketDataError::SymbolNotFound(_)));
    }

    #[test]
    fn test_profile_parsing() {
        let json = r#"{
            "name": "Apple Inc",
            "ticker": "AAPL",
            "exchange": "NASDAQ NMS - GLOBAL MARKET",
            "currency": "USD",
            "finnhubIndustry": "Technology",
            "country": "US",
            "marketCapitalization": 2800000
        }"#;

        let metadata = FinnhubProvider::parse_profile("AAPL", AssetCategory::Stock, json).unwrap();
        assert_eq!(metadata.display_name, "Apple Inc");
        assert_eq!(metadata.sector.as_deref(), Some("Technology"));
        assert_eq!(metadata.exchange.as_deref(), Some("NASDAQ NMS - GLOBAL MARKET"));
        assert_eq!(metadata.country.as_deref(), Some("US"));
    }

    #[test]
    fn test_empty_profile_is_not_found() {
        let err = FinnhubProvider::parse_profile("ZZZ", AssetCategory::Stock, "{}").unwrap_err();
        assert!(matches!(err, MarketDataError::SymbolNotFound(_)));
    }
}

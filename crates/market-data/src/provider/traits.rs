//! Market data provider trait definitions.
//!
//! This module defines the `MarketDataProvider` trait that all providers
//! implement, and the `QuoteNormalizer` adapter trait that isolates each
//! provider's payload shape.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::errors::MarketDataError;
use crate::models::{AssetCategory, AssetMetadata, LiveQuote};

use super::capabilities::ProviderCapabilities;
use super::config::ProviderConfig;

/// Trait for market data providers.
///
/// Implement this trait to add support for a new market data source.
/// The router uses the declared capabilities and the config's priority
/// class to place the provider in fallback chains; the scheduler uses the
/// config's limits for admission and retries.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use tickerhub_market_data::provider::{
///     Capability, MarketDataProvider, ProviderCapabilities, ProviderConfig,
/// };
///
/// struct MyProvider {
///     config: ProviderConfig,
/// }
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn config(&self) -> &ProviderConfig {
///         &self.config
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities {
///             capabilities: &[Capability::EquityQuote],
///             supports_discovery: false,
///         }
///     }
///
///     // ... implement get_quote
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "FINNHUB", "YAHOO", etc.
    /// Used for logging, rate tracking and the `source` of normalized data.
    fn id(&self) -> &'static str;

    /// Limits, retry policy and priority class.
    fn config(&self) -> &ProviderConfig;

    /// Describes what this provider can do.
    fn capabilities(&self) -> ProviderCapabilities;

    /// True when running without its own credential.
    fn is_demo(&self) -> bool {
        false
    }

    /// Fetch the latest quote for a gateway symbol.
    async fn get_quote(
        &self,
        symbol: &str,
        category: AssetCategory,
    ) -> Result<LiveQuote, MarketDataError>;

    /// Fetch descriptive metadata for a symbol.
    ///
    /// Default implementation returns `NotSupported`.
    async fn get_profile(
        &self,
        symbol: &str,
        category: AssetCategory,
    ) -> Result<AssetMetadata, MarketDataError> {
        let _ = (symbol, category);
        Err(MarketDataError::NotSupported {
            operation: "profile".to_string(),
            provider: self.id().to_string(),
        })
    }

    /// List the top `limit` assets of a category (e.g., by market cap).
    ///
    /// Default implementation returns `NotSupported`.
    async fn discover(
        &self,
        category: AssetCategory,
        limit: usize,
    ) -> Result<Vec<AssetMetadata>, MarketDataError> {
        let _ = (category, limit);
        Err(MarketDataError::NotSupported {
            operation: "discover".to_string(),
            provider: self.id().to_string(),
        })
    }
}

/// Adapter from a provider's raw quote payload to [`LiveQuote`].
///
/// Each provider implements this for its own response type so the
/// conversion can be tested without HTTP.
pub trait QuoteNormalizer {
    /// Deserialized provider payload.
    type Raw: DeserializeOwned;

    fn normalize_quote(&self, symbol: &str, raw: Self::Raw) -> Result<LiveQuote, MarketDataError>;
}

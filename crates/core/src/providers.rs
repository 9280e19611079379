//! Provider construction from credentials.
//!
//! A missing credential never aborts startup: the provider runs in its
//! demo/public mode or, when it has none, is left out. Each such case is
//! reported as a `ConfigurationMissing` warning.

use std::sync::Arc;

use log::{info, warn};
use tickerhub_market_data::provider::{alpha_vantage, coingecko, finnhub};
use tickerhub_market_data::{
    AlphaVantageProvider, CoinGeckoProvider, FinnhubProvider, MarketDataProvider, YahooProvider,
};

use crate::errors::Error;

pub const FINNHUB_API_KEY: &str = "FINNHUB_API_KEY";
pub const ALPHA_VANTAGE_API_KEY: &str = "ALPHA_VANTAGE_API_KEY";
pub const COINGECKO_API_KEY: &str = "COINGECKO_API_KEY";

/// API keys read once at process start.
#[derive(Clone, Debug, Default)]
pub struct ProviderCredentials {
    pub finnhub_api_key: Option<String>,
    pub alpha_vantage_api_key: Option<String>,
    pub coingecko_api_key: Option<String>,
}

impl ProviderCredentials {
    /// Blank keys count as missing.
    fn present(key: &Option<String>) -> Option<String> {
        key.as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Providers in registration order plus startup warnings.
pub struct ProviderSet {
    pub providers: Vec<Arc<dyn MarketDataProvider>>,
    pub warnings: Vec<Error>,
}

fn missing(provider: &str, key: &str) -> Error {
    Error::ConfigurationMissing {
        provider: provider.to_string(),
        key: key.to_string(),
    }
}

/// Build every provider the credentials allow.
pub fn build_providers(credentials: &ProviderCredentials) -> ProviderSet {
    let mut providers: Vec<Arc<dyn MarketDataProvider>> = Vec::new();
    let mut warnings = Vec::new();

    match ProviderCredentials::present(&credentials.finnhub_api_key) {
        Some(key) => providers.push(Arc::new(FinnhubProvider::new(key))),
        None => {
            warn!("{} not set, Finnhub disabled", FINNHUB_API_KEY);
            warnings.push(missing(finnhub::PROVIDER_ID, FINNHUB_API_KEY));
        }
    }

    let alpha_key = ProviderCredentials::present(&credentials.alpha_vantage_api_key);
    if alpha_key.is_none() {
        warn!(
            "{} not set, Alpha Vantage running on the demo key",
            ALPHA_VANTAGE_API_KEY
        );
        warnings.push(missing(alpha_vantage::PROVIDER_ID, ALPHA_VANTAGE_API_KEY));
    }
    providers.push(Arc::new(AlphaVantageProvider::new(alpha_key)));

    let coingecko_key = ProviderCredentials::present(&credentials.coingecko_api_key);
    if coingecko_key.is_none() {
        warn!(
            "{} not set, CoinGecko running on the public endpoint",
            COINGECKO_API_KEY
        );
        warnings.push(missing(coingecko::PROVIDER_ID, COINGECKO_API_KEY));
    }
    providers.push(Arc::new(CoinGeckoProvider::new(coingecko_key)));

    match YahooProvider::new() {
        Ok(provider) => providers.push(Arc::new(provider)),
        Err(e) => {
            warn!("Yahoo provider unavailable: {}", e);
            warnings.push(Error::MarketData(e));
        }
    }

    info!(
        "Market data providers: [{}]",
        providers
            .iter()
            .map(|p| if p.is_demo() {
                format!("{} (demo)", p.id())
            } else {
                p.id().to_string()
            })
            .collect::<Vec<_>>()
            .join(", ")
    );

    ProviderSet {
        providers,
        warnings,
    }
}

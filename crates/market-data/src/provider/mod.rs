//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - The `QuoteNormalizer` adapter trait isolating each payload shape
//! - Provider capabilities and static limits (`ProviderConfig`)
//! - Concrete provider implementations (Finnhub, Alpha Vantage, Yahoo, CoinGecko)
//!
//! # Architecture
//!
//! The provider system is designed to be:
//! - **Provider-agnostic**: the router only knows capabilities and configs
//! - **Extensible**: new providers are added by implementing `MarketDataProvider`
//! - **Resilient**: the rate tracker and scheduler gate every call a provider sees
//!
//! Providers receive gateway symbols ("AAPL", "BTC") and translate them into
//! their own addressing (e.g. `BTC-USD` on Yahoo, `bitcoin` on CoinGecko).

mod capabilities;
mod config;
mod traits;

pub mod alpha_vantage;
pub mod coingecko;
pub mod finnhub;
pub mod yahoo;

// Re-exports
pub use capabilities::{Capability, ProviderCapabilities};
pub use config::{PriorityClass, ProviderConfig, DEFAULT_PROVIDER_TIMEOUT};
pub use traits::{MarketDataProvider, QuoteNormalizer};

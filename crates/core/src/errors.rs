//! Core error types for the TickerHub gateway.
//!
//! Provider failures never surface here during routing: the router absorbs
//! them and reports exhaustion as a value. These variants cover startup and
//! configuration problems plus market data errors raised outside a chain.

use thiserror::Error;
use tickerhub_market_data::MarketDataError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    /// A provider credential is absent; the provider runs degraded or is disabled.
    #[error("Missing configuration for {provider}: {key}")]
    ConfigurationMissing { provider: String, key: String },

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),
}

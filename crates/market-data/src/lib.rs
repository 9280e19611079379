//! TickerHub market data crate.
//!
//! Provider-agnostic live quotes and asset metadata behind per-provider
//! rate limits.
//!
//! # Architecture
//!
//! ```text
//!   caller (cache, prefetch)
//!            |
//!            v
//!   +------------------+
//!   |  FallbackRouter  |  capability -> ordered provider chain
//!   +------------------+
//!            |
//!            v
//!   +------------------+     +-------------+
//!   | RequestScheduler | --> | RateTracker |  sliding windows, throttle
//!   +------------------+     +-------------+
//!            |
//!            v
//!   +------------------+
//!   |    Provider      |  Finnhub, Alpha Vantage, CoinGecko, Yahoo
//!   +------------------+
//!            |
//!            v
//!   LiveQuote / AssetMetadata
//! ```
//!
//! Routing never returns an error for an exhausted chain; callers get a
//! [`RouteOutcome`] and decide whether to serve stale data.

pub mod clock;
pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use clock::{system_clock, Clock, ManualClock, SharedClock, SystemClock};
pub use errors::{MarketDataError, RetryClass};

pub use models::{normalize_symbol, AssetCategory, AssetMetadata, LiveQuote, ProviderId};

pub use provider::alpha_vantage::AlphaVantageProvider;
pub use provider::coingecko::CoinGeckoProvider;
pub use provider::finnhub::FinnhubProvider;
pub use provider::yahoo::YahooProvider;
pub use provider::{
    Capability, MarketDataProvider, PriorityClass, ProviderCapabilities, ProviderConfig,
    QuoteNormalizer,
};

pub use registry::{
    AttemptOutcome, FallbackRouter, FetchDiagnostics, ProviderAttempt, QuoteValidator,
    RateSnapshot, RateTracker, RequestScheduler, RouteOutcome, RoutingMode, SchedulerConfig,
    SkipReason, ValidationSeverity,
};

//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all provider-facing operations
//! - [`RetryClass`]: Classification for determining retry and fallback behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while talking to market data providers.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which determines whether the scheduler retries the attempt and whether the
/// adaptive throttle is applied.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested symbol was not found by the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider cannot serve this kind of asset.
    #[error("Unsupported asset type: {0}")]
    UnsupportedAssetType(String),

    /// The provider rate limited the request (HTTP 429 / 403 quota).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// A provider-specific error occurred (HTTP status, malformed payload, ...).
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// Normalized data failed validation checks.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// Description of the validation failure
        message: String,
    },

    /// The provider does not implement the requested operation.
    #[error("Operation '{operation}' not supported by {provider}")]
    NotSupported {
        /// Operation name (e.g. "profile", "discover")
        operation: String,
        /// Provider identifier
        provider: String,
    },

    /// Admission was refused and the request could not be queued
    /// (queue full, unknown provider, or scheduler stopped).
    #[error("Provider denied: {provider} - {reason}")]
    ProviderDenied {
        /// The provider that refused admission
        provider: String,
        /// Why the request could not wait for capacity
        reason: String,
    },

    /// Every retry for a provider failed.
    #[error("Retries exhausted for {provider} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// The provider that kept failing
        provider: String,
        /// Number of attempts made (initial + retries)
        attempts: u32,
        /// Display text of the final error
        last_error: String,
    },

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// - [`RetryClass::Never`]: the request itself is bad for this provider; don't retry it
    /// - [`RetryClass::FailoverWithPenalty`]: retry with backoff and throttle the provider
    /// - [`RetryClass::NextProvider`]: retry with backoff, no throttle penalty
    ///
    /// # Examples
    ///
    /// ```
    /// use tickerhub_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { provider: "FINNHUB".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::FailoverWithPenalty);
    ///
    /// let error = MarketDataError::SymbolNotFound("INVALID".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::SymbolNotFound(_)
            | Self::UnsupportedAssetType(_)
            | Self::ValidationFailed { .. }
            | Self::NotSupported { .. }
            | Self::ProviderDenied { .. }
            | Self::RetriesExhausted { .. } => RetryClass::Never,

            Self::RateLimited { .. } => RetryClass::FailoverWithPenalty,

            Self::Timeout { .. } | Self::ProviderError { .. } | Self::Network(_) => {
                RetryClass::NextProvider
            }
        }
    }

    /// True for rate-limit-class failures that should engage the adaptive throttle.
    pub fn is_rate_limit(&self) -> bool {
        self.retry_class() == RetryClass::FailoverWithPenalty
    }

    /// Shorthand for a [`MarketDataError::ProviderError`].
    pub fn provider(provider: &str, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

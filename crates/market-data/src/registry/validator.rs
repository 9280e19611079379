//! Live quote validation.
//!
//! Normalized quotes are checked before they leave the router:
//! - price must be positive
//! - high >= low, and neither negative
//! - volume and market cap non-negative
//! - timestamp not further in the future than the allowed clock skew
//!
//! A hard failure rejects the quote and the router tries the next provider.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::warn;
use rust_decimal::Decimal;

use crate::clock::to_chrono;
use crate::errors::MarketDataError;
use crate::models::LiveQuote;

/// Validation severity levels.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationSeverity {
    /// Hard failure - reject quote, try next provider.
    Hard,
    /// Soft warning - accept quote but log warning.
    Soft,
}

#[derive(Clone, Debug)]
struct ValidationIssue {
    severity: ValidationSeverity,
    message: String,
}

impl ValidationIssue {
    fn hard(message: String) -> Self {
        Self {
            severity: ValidationSeverity::Hard,
            message,
        }
    }

    fn soft(message: String) -> Self {
        Self {
            severity: ValidationSeverity::Soft,
            message,
        }
    }
}

/// Quote validator configuration.
#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    /// How far ahead of "now" a quote timestamp may be.
    pub max_future_skew: Duration,
    /// Prices above this are accepted with a warning.
    pub max_price: Option<Decimal>,
    pub warn_on_zero_volume: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_future_skew: Duration::from_secs(5 * 60),
            max_price: Some(Decimal::from(1_000_000_000i64)),
            warn_on_zero_volume: false,
        }
    }
}

/// Live quote validator.
#[derive(Clone, Debug, Default)]
pub struct QuoteValidator {
    config: ValidatorConfig,
}

impl QuoteValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate a quote against `now`.
    ///
    /// Warnings are logged but do not cause rejection.
    pub fn validate(&self, quote: &LiveQuote, now: DateTime<Utc>) -> Result<(), MarketDataError> {
        let mut issues = Vec::new();

        self.validate_price(quote, &mut issues);
        self.validate_range(quote, &mut issues);
        self.validate_sizes(quote, &mut issues);
        self.validate_timestamp(quote, now, &mut issues);

        let errors: Vec<&str> = issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Hard)
            .map(|i| i.message.as_str())
            .collect();

        if !errors.is_empty() {
            return Err(MarketDataError::ValidationFailed {
                message: format!("{} from {}: {}", quote.symbol, quote.source, errors.join("; ")),
            });
        }

        for issue in issues.iter().filter(|i| i.severity == ValidationSeverity::Soft) {
            warn!("Quote validation warning for {}: {}", quote.symbol, issue.message);
        }

        Ok(())
    }

    fn validate_price(&self, quote: &LiveQuote, issues: &mut Vec<ValidationIssue>) {
        if quote.price <= Decimal::ZERO {
            issues.push(ValidationIssue::hard(format!(
                "Non-positive price: {}",
                quote.price
            )));
        }

        if let Some(max_price) = self.config.max_price {
            if quote.price > max_price {
                issues.push(ValidationIssue::soft(format!(
                    "Price ({}) exceeds max threshold ({})",
                    quote.price, max_price
                )));
            }
        }
    }

    fn validate_range(&self, quote: &LiveQuote, issues: &mut Vec<ValidationIssue>) {
        if let (Some(high), Some(low)) = (quote.high, quote.low) {
            if high < low {
                issues.push(ValidationIssue::hard(format!(
                    "High ({}) is less than Low ({})",
                    high, low
                )));
            } else if quote.price < low || quote.price > high {
                // Intraday range lags the live price on some feeds
                issues.push(ValidationIssue::soft(format!(
                    "Price ({}) is outside High/Low range ({}-{})",
                    quote.price, low, high
                )));
            }
        }

        for (label, value) in [("high", quote.high), ("low", quote.low), ("open", quote.open)] {
            if let Some(v) = value {
                if v < Decimal::ZERO {
                    issues.push(ValidationIssue::hard(format!("Negative {} price: {}", label, v)));
                }
            }
        }
    }

    fn validate_sizes(&self, quote: &LiveQuote, issues: &mut Vec<ValidationIssue>) {
        if let Some(volume) = quote.volume_24h {
            if volume < Decimal::ZERO {
                issues.push(ValidationIssue::hard(format!("Negative volume: {}", volume)));
            } else if volume.is_zero() && self.config.warn_on_zero_volume {
                issues.push(ValidationIssue::soft("Zero volume".to_string()));
            }
        }

        if let Some(market_cap) = quote.market_cap {
            if market_cap < Decimal::ZERO {
                issues.push(ValidationIssue::hard(format!(
                    "Negative market cap: {}",
                    market_cap
                )));
            }
        }
    }

    fn validate_timestamp(
        &self,
        quote: &LiveQuote,
        now: DateTime<Utc>,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let limit = now + to_chrono(self.config.max_future_skew);
        if quote.last_updated > limit {
            issues.push(ValidationIssue::hard(format!(
                "Timestamp {} is in the future",
                quote.last_updated
            )));
        }
    }
}

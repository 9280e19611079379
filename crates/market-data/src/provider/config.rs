//! Static per-provider limits and retry policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-call timeout for outbound provider requests.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(8);

/// Base priority of a provider on a 1–3 scale (higher drains first).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityClass {
    Low = 1,
    Normal = 2,
    High = 3,
}

impl PriorityClass {
    pub fn weight(&self) -> u32 {
        *self as u32
    }
}

/// Rate limits and retry policy for one provider.
///
/// Built once at startup and never mutated; the rate tracker and the
/// scheduler only read it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub name: String,
    pub requests_per_minute: u32,
    pub requests_per_hour: u32,
    pub requests_per_day: u32,
    /// Maximum admissions within any trailing one-second window.
    pub burst_limit: u32,
    /// Minimum spacing between two requests.
    pub cooldown: Duration,
    /// Retries after the first attempt.
    pub retry_attempts: u32,
    /// Base delay for exponential backoff.
    pub retry_delay: Duration,
    pub priority_class: PriorityClass,
    /// Per-call timeout.
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Start a config with permissive defaults (60/min, no cooldown).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requests_per_minute: 60,
            requests_per_hour: 3_600,
            requests_per_day: 86_400,
            burst_limit: 5,
            cooldown: Duration::ZERO,
            retry_attempts: 2,
            retry_delay: Duration::from_millis(500),
            priority_class: PriorityClass::Normal,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_windows(mut self, per_minute: u32, per_hour: u32, per_day: u32) -> Self {
        self.requests_per_minute = per_minute;
        self.requests_per_hour = per_hour;
        self.requests_per_day = per_day;
        self
    }

    pub fn with_burst(mut self, burst_limit: u32) -> Self {
        self.burst_limit = burst_limit;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    pub fn with_priority(mut self, priority_class: PriorityClass) -> Self {
        self.priority_class = priority_class;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reduced limits for providers running without their own credential.
    ///
    /// Window limits are divided by `factor` (never below 1) and the
    /// cooldown is multiplied by it.
    pub fn demo(mut self, factor: u32) -> Self {
        let factor = factor.max(1);
        self.requests_per_minute = (self.requests_per_minute / factor).max(1);
        self.requests_per_hour = (self.requests_per_hour / factor).max(1);
        self.requests_per_day = (self.requests_per_day / factor).max(1);
        self.burst_limit = (self.burst_limit / factor).max(1);
        self.cooldown = self.cooldown.max(Duration::from_millis(250)) * factor;
        self
    }

    /// Backoff delay before retry number `retry_count` (0-based).
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry_count.min(16));
        self.retry_delay.saturating_mul(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let config = ProviderConfig::new("TEST").with_retry(3, Duration::from_millis(200));
        assert_eq!(config.backoff_delay(0), Duration::from_millis(200));
        assert_eq!(config.backoff_delay(1), Duration::from_millis(400));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(800));
    }

    #[test]
    fn test_demo_scales_limits() {
        let config = ProviderConfig::new("TEST")
            .with_windows(30, 500, 10_000)
            .with_burst(5)
            .with_cooldown(Duration::from_secs(2))
            .demo(3);

        assert_eq!(config.requests_per_minute, 10);
        assert_eq!(config.requests_per_hour, 166);
        assert_eq!(config.requests_per_day, 3_333);
        assert_eq!(config.burst_limit, 1);
        assert_eq!(config.cooldown, Duration::from_secs(6));
    }

    #[test]
    fn test_demo_never_reaches_zero() {
        let config = ProviderConfig::new("TEST").with_windows(1, 1, 1).demo(10);
        assert_eq!(config.requests_per_minute, 1);
        assert_eq!(config.requests_per_day, 1);
    }

    #[test]
    fn test_priority_weights() {
        assert_eq!(PriorityClass::Low.weight(), 1);
        assert_eq!(PriorityClass::Normal.weight(), 2);
        assert_eq!(PriorityClass::High.weight(), 3);
    }
}

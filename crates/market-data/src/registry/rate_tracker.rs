//! Sliding-window rate tracker for market data providers.
//!
//! Keeps, per provider, the timestamps of recently admitted requests and an
//! adaptive throttle that grows each time the provider answers with a
//! rate-limit error. Admission requires all of:
//!
//! - the provider's cooldown has elapsed since its last request
//! - fewer than `burst_limit` admissions in the trailing second
//! - the trailing minute/hour/day counts are below their limits
//! - no adaptive throttle is active
//!
//! Every check and its mutation happen under one short, synchronous lock.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use crate::clock::{elapsed_between, to_chrono, SharedClock};
use crate::provider::ProviderConfig;

const SECOND: Duration = Duration::from_secs(1);
const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3_600);
const DAY: Duration = Duration::from_secs(86_400);

/// Throttle ceiling, in throttle units.
const MAX_THROTTLE_UNITS: u32 = 10;

/// Result of one provider attempt as seen by the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure,
    /// HTTP 429/403-equivalent; engages the adaptive throttle.
    RateLimited,
}

/// Why admission was refused. Only used for debug logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Denial {
    Cooldown,
    Burst,
    Minute,
    Hour,
    Day,
    Throttled,
}

#[derive(Debug)]
struct RateState {
    config: ProviderConfig,
    /// Admission timestamps, oldest first.
    timestamps: VecDeque<DateTime<Utc>>,
    last_request_at: Option<DateTime<Utc>>,
    throttle_until: Option<DateTime<Utc>>,
    /// Duration of the most recent throttle; zero when not throttled.
    throttle_current: Duration,
    successes: u64,
    failures: u64,
    rate_limit_hits: u64,
}

impl RateState {
    fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            timestamps: VecDeque::new(),
            last_request_at: None,
            throttle_until: None,
            throttle_current: Duration::ZERO,
            successes: 0,
            failures: 0,
            rate_limit_hits: 0,
        }
    }

    /// Drop entries older than a day and never keep more than the daily limit.
    fn prune(&mut self, now: DateTime<Utc>) {
        let horizon = now - to_chrono(DAY);
        while self.timestamps.front().is_some_and(|ts| *ts <= horizon) {
            self.timestamps.pop_front();
        }
        let cap = self.config.requests_per_day as usize;
        while self.timestamps.len() > cap {
            self.timestamps.pop_front();
        }
    }

    /// Clear an expired throttle, resetting its growth.
    fn clear_expired_throttle(&mut self, now: DateTime<Utc>) {
        if self.throttle_until.is_some_and(|until| until <= now) {
            self.throttle_until = None;
            self.throttle_current = Duration::ZERO;
        }
    }

    /// Admissions within the half-open window `(now - window, now]`.
    fn count_within(&self, now: DateTime<Utc>, window: Duration) -> u32 {
        let start = now - to_chrono(window);
        let count = self
            .timestamps
            .iter()
            .rev()
            .take_while(|ts| **ts > start)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn check(&mut self, now: DateTime<Utc>) -> Result<(), Denial> {
        self.prune(now);
        self.clear_expired_throttle(now);

        if self.throttle_until.is_some() {
            return Err(Denial::Throttled);
        }
        if let Some(last) = self.last_request_at {
            if elapsed_between(last, now) < self.config.cooldown {
                return Err(Denial::Cooldown);
            }
        }
        if self.count_within(now, SECOND) >= self.config.burst_limit {
            return Err(Denial::Burst);
        }
        if self.count_within(now, MINUTE) >= self.config.requests_per_minute {
            return Err(Denial::Minute);
        }
        if self.count_within(now, HOUR) >= self.config.requests_per_hour {
            return Err(Denial::Hour);
        }
        if self.count_within(now, DAY) >= self.config.requests_per_day {
            return Err(Denial::Day);
        }
        Ok(())
    }

    /// Time until `limit` admissions no longer fill the trailing `window`.
    fn window_wait(&self, now: DateTime<Utc>, window: Duration, limit: u32) -> Duration {
        if limit == 0 {
            return window;
        }
        let start = now - to_chrono(window);
        let in_window: Vec<&DateTime<Utc>> =
            self.timestamps.iter().filter(|ts| **ts > start).collect();
        let limit = limit as usize;
        if in_window.len() < limit {
            return Duration::ZERO;
        }
        // Oldest entry whose expiry brings the count below the limit
        let leaving = *in_window[in_window.len() - limit];
        elapsed_between(now, leaving + to_chrono(window))
    }

    /// Lower bound on how long until `check` can pass, ignoring new traffic.
    fn time_until_admissible(&mut self, now: DateTime<Utc>) -> Duration {
        self.prune(now);
        self.clear_expired_throttle(now);

        let throttle = self
            .throttle_until
            .map(|until| elapsed_between(now, until))
            .unwrap_or(Duration::ZERO);
        let cooldown = self
            .last_request_at
            .map(|last| self.config.cooldown.saturating_sub(elapsed_between(last, now)))
            .unwrap_or(Duration::ZERO);

        [
            throttle,
            cooldown,
            self.window_wait(now, SECOND, self.config.burst_limit),
            self.window_wait(now, MINUTE, self.config.requests_per_minute),
            self.window_wait(now, HOUR, self.config.requests_per_hour),
            self.window_wait(now, DAY, self.config.requests_per_day),
        ]
        .into_iter()
        .max()
        .unwrap_or(Duration::ZERO)
    }

    fn reserve(&mut self, now: DateTime<Utc>) {
        self.timestamps.push_back(now);
        self.last_request_at = Some(now);
        self.prune(now);
    }

    /// Grow the throttle: `min(current + 2*unit, 10*unit)`, unit = max(cooldown, 1s).
    fn throttle(&mut self, now: DateTime<Utc>) -> Duration {
        let unit = self.config.cooldown.max(SECOND);
        let grown = self.throttle_current.saturating_add(unit.saturating_mul(2));
        self.throttle_current = grown.min(unit.saturating_mul(MAX_THROTTLE_UNITS));
        self.throttle_until = Some(now + to_chrono(self.throttle_current));
        self.throttle_current
    }

    fn record(&mut self, outcome: AttemptOutcome, now: DateTime<Utc>) -> Option<Duration> {
        match outcome {
            AttemptOutcome::Success => {
                self.successes += 1;
                None
            }
            AttemptOutcome::Failure => {
                self.failures += 1;
                None
            }
            AttemptOutcome::RateLimited => {
                self.failures += 1;
                self.rate_limit_hits += 1;
                Some(self.throttle(now))
            }
        }
    }

    fn snapshot(&mut self, provider: &str, now: DateTime<Utc>) -> RateSnapshot {
        self.prune(now);
        self.clear_expired_throttle(now);

        let requests_last_minute = self.count_within(now, MINUTE);
        let utilization = if self.config.requests_per_minute == 0 {
            1.0
        } else {
            (f64::from(requests_last_minute) / f64::from(self.config.requests_per_minute)).min(1.0)
        };

        RateSnapshot {
            provider: provider.to_string(),
            requests_last_minute,
            requests_last_hour: self.count_within(now, HOUR),
            requests_last_day: self.count_within(now, DAY),
            utilization,
            throttled: self.throttle_until.is_some(),
            throttle_remaining: self.throttle_until.map(|until| elapsed_between(now, until)),
            last_request_at: self.last_request_at,
            idle_for: self.last_request_at.map(|last| elapsed_between(last, now)),
            successes: self.successes,
            failures: self.failures,
            rate_limit_hits: self.rate_limit_hits,
        }
    }
}

/// Point-in-time view of one provider's rate state.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSnapshot {
    pub provider: String,
    pub requests_last_minute: u32,
    pub requests_last_hour: u32,
    pub requests_last_day: u32,
    /// Minute count over minute limit, 0.0..=1.0.
    pub utilization: f64,
    pub throttled: bool,
    pub throttle_remaining: Option<Duration>,
    pub last_request_at: Option<DateTime<Utc>>,
    /// Time since the last request; `None` if never used.
    pub idle_for: Option<Duration>,
    pub successes: u64,
    pub failures: u64,
    pub rate_limit_hits: u64,
}

/// Per-provider admission control.
///
/// Thread-safe; shared by the scheduler and the router through an `Arc`.
pub struct RateTracker {
    clock: SharedClock,
    states: Mutex<HashMap<String, RateState>>,
    /// Unknown providers already reported, so each is logged once.
    unknown_seen: Mutex<HashSet<String>>,
}

impl RateTracker {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            states: Mutex::new(HashMap::new()),
            unknown_seen: Mutex::new(HashSet::new()),
        }
    }

    /// Lock the states mutex, recovering from poison if necessary.
    fn lock_states(&self) -> MutexGuard<'_, HashMap<String, RateState>> {
        self.states.lock().unwrap_or_else(|poisoned| {
            warn!("Rate tracker states mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn note_unknown(&self, provider: &str) {
        let mut seen = self.unknown_seen.lock().unwrap_or_else(|p| p.into_inner());
        if seen.insert(provider.to_string()) {
            debug!("Rate tracker: unknown provider '{}' denied", provider);
        }
    }

    /// Register (or replace) a provider's limits. Replacing resets its state.
    pub fn register(&self, config: ProviderConfig) {
        let name = config.name.clone();
        self.lock_states().insert(name, RateState::new(config));
    }

    pub fn is_registered(&self, provider: &str) -> bool {
        self.lock_states().contains_key(provider)
    }

    pub fn config(&self, provider: &str) -> Option<ProviderConfig> {
        self.lock_states().get(provider).map(|s| s.config.clone())
    }

    /// Registered provider names, sorted.
    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock_states().keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether a request to `provider` would be admitted right now.
    ///
    /// Pure check: does not reserve a slot.
    pub fn can_admit(&self, provider: &str) -> bool {
        let now = self.clock.now();
        let mut states = self.lock_states();
        match states.get_mut(provider) {
            Some(state) => state.check(now).is_ok(),
            None => {
                drop(states);
                self.note_unknown(provider);
                false
            }
        }
    }

    /// Check admission and, if admitted, reserve the slot in the same
    /// critical section.
    pub fn try_admit(&self, provider: &str) -> bool {
        let now = self.clock.now();
        let mut states = self.lock_states();
        let Some(state) = states.get_mut(provider) else {
            drop(states);
            self.note_unknown(provider);
            return false;
        };

        match state.check(now) {
            Ok(()) => {
                state.reserve(now);
                true
            }
            Err(denial) => {
                debug!("Rate tracker: '{}' denied ({:?})", provider, denial);
                false
            }
        }
    }

    /// How long until `provider` could admit a request, if nothing else is
    /// admitted meanwhile. `None` for unknown providers.
    pub fn time_until_admissible(&self, provider: &str) -> Option<Duration> {
        let now = self.clock.now();
        self.lock_states()
            .get_mut(provider)
            .map(|state| state.time_until_admissible(now))
    }

    /// Record the result of an attempt whose slot was already reserved.
    pub fn record_outcome(&self, provider: &str, outcome: AttemptOutcome) {
        let now = self.clock.now();
        let throttled = {
            let mut states = self.lock_states();
            match states.get_mut(provider) {
                Some(state) => state.record(outcome, now),
                None => return,
            }
        };

        if let Some(duration) = throttled {
            warn!(
                "Rate tracker: '{}' rate limited, throttling for {:?}",
                provider, duration
            );
        }
    }

    /// Count a request and record its result in one call.
    pub fn record_attempt(&self, provider: &str, outcome: AttemptOutcome) {
        let now = self.clock.now();
        {
            let mut states = self.lock_states();
            match states.get_mut(provider) {
                Some(state) => state.reserve(now),
                None => return,
            }
        }
        self.record_outcome(provider, outcome);
    }

    /// Extend the provider's adaptive throttle.
    pub fn apply_adaptive_throttle(&self, provider: &str) {
        let now = self.clock.now();
        let duration = {
            let mut states = self.lock_states();
            match states.get_mut(provider) {
                Some(state) => state.throttle(now),
                None => return,
            }
        };
        warn!(
            "Rate tracker: adaptive throttle on '{}' for {:?}",
            provider, duration
        );
    }

    pub fn snapshot(&self, provider: &str) -> Option<RateSnapshot> {
        let now = self.clock.now();
        self.lock_states()
            .get_mut(provider)
            .map(|state| state.snapshot(provider, now))
    }

    /// Snapshots of every registered provider, sorted by name.
    pub fn snapshots(&self) -> Vec<RateSnapshot> {
        let now = self.clock.now();
        let mut states = self.lock_states();
        let mut out: Vec<RateSnapshot> = states
            .iter_mut()
            .map(|(name, state)| state.snapshot(name, now))
            .collect();
        out.sort_by(|a, b| a.provider.cmp(&b.provider));
        out
    }
}

//! Property-based tests for the sliding-window rate tracker.
//!
//! Whatever the request pattern, admitted requests must respect every
//! configured window, the burst limit and the cooldown.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use tickerhub_market_data::registry::{AttemptOutcome, RateTracker};
use tickerhub_market_data::{Clock, ManualClock, ProviderConfig};

// =============================================================================
// Generators
// =============================================================================

/// Gaps between request attempts, in milliseconds. Mostly short so windows fill up.
fn arb_gaps() -> impl Strategy<Value = Vec<u64>> {
    proptest::collection::vec(prop_oneof![4 => 0u64..400, 1 => 400u64..20_000], 1..300)
}

/// (per_minute, burst, cooldown_ms)
fn arb_limits() -> impl Strategy<Value = (u32, u32, u64)> {
    (1u32..30, 1u32..6, prop_oneof![Just(0u64), 50u64..1_500])
}

fn admitted_times(config: ProviderConfig, gaps: &[u64]) -> Vec<DateTime<Utc>> {
    let clock = Arc::new(ManualClock::starting_now());
    let tracker = RateTracker::new(clock.clone());
    let name = config.name.clone();
    tracker.register(config);

    let mut admitted = Vec::new();
    for gap in gaps {
        clock.advance_ms(*gap);
        if tracker.try_admit(&name) {
            admitted.push(clock.now());
        }
    }
    admitted
}

fn max_in_window(times: &[DateTime<Utc>], window: chrono::Duration) -> usize {
    times
        .iter()
        .map(|end| {
            times
                .iter()
                .filter(|t| **t > *end - window && **t <= *end)
                .count()
        })
        .max()
        .unwrap_or(0)
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// No trailing 60s window ever holds more admissions than the per-minute limit.
    #[test]
    fn prop_minute_window_never_exceeded(gaps in arb_gaps(), (rpm, burst, cooldown) in arb_limits()) {
        let config = ProviderConfig::new("P")
            .with_windows(rpm, 10_000, 100_000)
            .with_burst(burst)
            .with_cooldown(Duration::from_millis(cooldown));
        let admitted = admitted_times(config, &gaps);

        prop_assert!(max_in_window(&admitted, chrono::Duration::seconds(60)) <= rpm as usize);
    }

    /// No trailing 1s window holds more admissions than the burst limit.
    #[test]
    fn prop_burst_never_exceeded(gaps in arb_gaps(), (rpm, burst, cooldown) in arb_limits()) {
        let config = ProviderConfig::new("P")
            .with_windows(rpm.max(burst), 10_000, 100_000)
            .with_burst(burst)
            .with_cooldown(Duration::from_millis(cooldown));
        let admitted = admitted_times(config, &gaps);

        prop_assert!(max_in_window(&admitted, chrono::Duration::seconds(1)) <= burst as usize);
    }

    /// Consecutive admissions are at least one cooldown apart.
    #[test]
    fn prop_cooldown_respected(gaps in arb_gaps(), (rpm, burst, cooldown) in arb_limits()) {
        let config = ProviderConfig::new("P")
            .with_windows(rpm, 10_000, 100_000)
            .with_burst(burst)
            .with_cooldown(Duration::from_millis(cooldown));
        let admitted = admitted_times(config, &gaps);

        for pair in admitted.windows(2) {
            prop_assert!(pair[1] - pair[0] >= chrono::Duration::milliseconds(cooldown as i64));
        }
    }

    /// While throttled the tracker admits nothing, and the minute counter
    /// never reports more than was admitted.
    #[test]
    fn prop_throttle_blocks_admission(hits in 1usize..6, offset_ms in 0u64..1_000) {
        let clock = Arc::new(ManualClock::starting_now());
        let tracker = RateTracker::new(clock.clone());
        tracker.register(ProviderConfig::new("P").with_burst(100));

        for _ in 0..hits {
            tracker.record_attempt("P", AttemptOutcome::RateLimited);
        }

        clock.advance_ms(offset_ms);
        prop_assert!(!tracker.try_admit("P"));

        let snapshot = tracker.snapshot("P").expect("registered");
        prop_assert!(snapshot.throttled);
        prop_assert_eq!(snapshot.requests_last_minute as usize, hits);
        prop_assert_eq!(snapshot.rate_limit_hits as usize, hits);
    }
}

//! Property-based tests for the tiered cache.
//!
//! Without new writes, an entry's status only degrades over time
//! (fresh -> stale -> fallback), and neither store ever holds more entries
//! than its configured capacity.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use rust_decimal::Decimal;
use tickerhub_core::{CacheConfig, CacheStatus, TieredCache};
use tickerhub_market_data::{AssetCategory, AssetMetadata, Clock, LiveQuote, ManualClock};

// =============================================================================
// Generators
// =============================================================================

fn arb_category() -> impl Strategy<Value = AssetCategory> {
    prop_oneof![
        Just(AssetCategory::Stock),
        Just(AssetCategory::Etf),
        Just(AssetCategory::Crypto),
    ]
}

/// Read offsets in seconds, spanning past the metadata TTL.
fn arb_read_offsets() -> impl Strategy<Value = Vec<u64>> {
    proptest::collection::vec(prop_oneof![3 => 0u64..120, 1 => 120u64..30_000], 1..40)
}

#[derive(Debug, Clone)]
enum Op {
    Metadata(u8),
    Live(u8),
    Advance(u64),
    Sweep,
    Evict(u8),
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(
        prop_oneof![
            4 => (0u8..40).prop_map(Op::Metadata),
            4 => (0u8..40).prop_map(Op::Live),
            2 => (0u64..3_600).prop_map(Op::Advance),
            1 => Just(Op::Sweep),
            1 => (0u8..40).prop_map(Op::Evict),
        ],
        1..200,
    )
}

fn symbol(n: u8) -> String {
    format!("SYM{}", n)
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #[test]
    fn prop_status_only_degrades(
        category in arb_category(),
        with_metadata in any::<bool>(),
        with_live in any::<bool>(),
        sweep_between in any::<bool>(),
        mut offsets in arb_read_offsets(),
    ) {
        let clock = Arc::new(ManualClock::starting_now());
        let cache = TieredCache::new(CacheConfig::default(), clock.clone());
        let start = clock.now();

        if with_metadata {
            cache.set_metadata(AssetMetadata::new("ABC", "Abc", category, start));
        }
        if with_live {
            cache.set_live_data(LiveQuote::new("ABC", Decimal::ONE, "P", start), category);
        }

        offsets.sort_unstable();
        let mut previous = CacheStatus::Fresh;
        for offset in offsets {
            clock.set(start + chrono::Duration::seconds(offset as i64));
            if sweep_between {
                cache.sweep();
            }
            let status = cache.get("ABC").status;
            prop_assert!(status >= previous, "{:?} after {:?}", status, previous);
            previous = status;
        }
    }

    #[test]
    fn prop_stores_never_exceed_capacity(
        metadata_cap in 1usize..12,
        live_cap in 1usize..12,
        ops in arb_ops(),
    ) {
        let config = CacheConfig {
            metadata_max_entries: metadata_cap,
            live_max_entries: live_cap,
            ..CacheConfig::default()
        };
        let clock = Arc::new(ManualClock::starting_now());
        let cache = TieredCache::new(config, clock.clone());

        for op in ops {
            match op {
                Op::Metadata(n) => cache.set_metadata(AssetMetadata::new(
                    symbol(n),
                    "x",
                    AssetCategory::Stock,
                    clock.now(),
                )),
                Op::Live(n) => cache.set_live_data(
                    LiveQuote::new(symbol(n), Decimal::ONE, "P", clock.now()),
                    AssetCategory::Crypto,
                ),
                Op::Advance(secs) => clock.advance(Duration::from_secs(secs)),
                Op::Sweep => {
                    cache.sweep();
                }
                Op::Evict(n) => {
                    cache.evict(&symbol(n));
                }
            }
            let stats = cache.stats();
            prop_assert!(stats.metadata_entries <= metadata_cap);
            prop_assert!(stats.live_entries <= live_cap);
        }
    }

    #[test]
    fn prop_most_recent_write_survives(
        cap in 1usize..8,
        writes in proptest::collection::vec(0u8..30, 1..60),
    ) {
        let config = CacheConfig {
            live_max_entries: cap,
            ..CacheConfig::default()
        };
        let clock = Arc::new(ManualClock::starting_now());
        let cache = TieredCache::new(config, clock.clone());

        for n in writes {
            clock.advance_ms(10);
            cache.set_live_data(
                LiveQuote::new(symbol(n), Decimal::ONE, "P", clock.now()),
                AssetCategory::Stock,
            );
            prop_assert!(cache.get(&symbol(n)).live.is_some());
        }
    }
}

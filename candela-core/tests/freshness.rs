use std::time::Duration;

use candela_core::is_stale;
use candela_types::{Bar, CachedBar, FreshnessPolicy, Timeframe};
use rust_decimal::Decimal;

const MIN_MS: i64 = 60_000;
const DAY_MS: i64 = 86_400_000;

fn cached(ts: i64, fetched_at: i64) -> CachedBar {
    CachedBar {
        bar: Bar {
            ts,
            open: Decimal::ONE,
            high: Decimal::ONE,
            low: Decimal::ONE,
            close: Decimal::ONE,
            volume: 0,
        },
        provider: "polygon".into(),
        revision: 1,
        fetched_at,
    }
}

#[test]
fn recent_fetch_is_fresh() {
    let now = 100 * DAY_MS;
    let bar = cached(now - 10 * MIN_MS, now - MIN_MS);
    assert!(!is_stale(&bar, Timeframe::M5, &FreshnessPolicy::default(), now));
}

#[test]
fn ttl_expiry_makes_a_live_bar_stale() {
    let now = 100 * DAY_MS;
    // 5m TTL is 15 minutes; fetched 16 minutes ago.
    let bar = cached(now - 30 * MIN_MS, now - 16 * MIN_MS);
    assert!(is_stale(&bar, Timeframe::M5, &FreshnessPolicy::default(), now));
}

#[test]
fn historical_bars_never_go_stale() {
    let now = 100 * DAY_MS;
    // Eight days old, fetched long past its TTL.
    let bar = cached(now - 8 * DAY_MS, now - 2 * DAY_MS);
    assert!(!is_stale(&bar, Timeframe::M5, &FreshnessPolicy::default(), now));
}

#[test]
fn overrides_change_the_ttl() {
    let now = 100 * DAY_MS;
    let policy = FreshnessPolicy::default().with_override(Timeframe::M5, Duration::from_secs(60));
    let bar = cached(now - 10 * MIN_MS, now - 2 * MIN_MS);
    assert!(is_stale(&bar, Timeframe::M5, &policy, now));
    assert!(!is_stale(&bar, Timeframe::M5, &FreshnessPolicy::default(), now));
}

#[test]
fn freshness_is_monotone_in_wall_time() {
    let now = 100 * DAY_MS;
    let bar = cached(now - 30 * MIN_MS, now - 10 * MIN_MS);
    let policy = FreshnessPolicy::default();
    // Fresh now implies fresh at every earlier instant after the fetch.
    assert!(!is_stale(&bar, Timeframe::M5, &policy, now));
    for back in 0..10 {
        assert!(!is_stale(&bar, Timeframe::M5, &policy, now - back * MIN_MS));
    }
}

use candela_types::{CachedBar, FreshnessPolicy, Timeframe};

/// Whether a cached bar should be refreshed from providers.
///
/// Local predicate, no I/O. Bars older than the seven-day historical cutoff
/// are considered finalized and never stale; otherwise a bar is stale once
/// its `fetched_at` is older than the policy TTL for its timeframe.
#[must_use]
pub fn is_stale(
    bar: &CachedBar,
    timeframe: Timeframe,
    policy: &FreshnessPolicy,
    now_ms: i64,
) -> bool {
    let cutoff_ms = i64::try_from(FreshnessPolicy::HISTORICAL_CUTOFF.as_millis()).unwrap_or(i64::MAX);
    if now_ms.saturating_sub(bar.ts()) > cutoff_ms {
        return false;
    }
    let ttl_ms = i64::try_from(policy.ttl_for(timeframe).as_millis()).unwrap_or(i64::MAX);
    now_ms.saturating_sub(bar.fetched_at) > ttl_ms
}

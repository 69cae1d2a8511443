//! Configuration types shared across the cache service and its collaborators.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::freshness::FreshnessPolicy;
use crate::symbol::ContractMonth;

/// How a continuous root decides it is time to leave the front contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RolloverTrigger {
    /// Roll once the next contract's volume reaches `ratio` times the front
    /// contract's volume. Falls back to `days_before_expiry` when the caller
    /// has no volume data.
    VolumeThreshold {
        /// Next/front volume ratio at which the roll happens.
        ratio: f64,
    },
    /// Roll a fixed number of days before expiry, unconditionally.
    DaysBeforeExpiry,
}

/// Which calendar day a contract month expires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ExpiryAnchor {
    /// Third Friday of the delivery month (equity index futures).
    ThirdFriday,
    /// The Wednesday before the third Friday.
    WednesdayBeforeThirdFriday,
    /// An explicit day of the delivery month.
    Day(u8),
}

/// Per-root rollover behaviour for continuous futures resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloverRule {
    /// When to roll to the next contract.
    pub trigger: RolloverTrigger,
    /// Days before expiry used by [`RolloverTrigger::DaysBeforeExpiry`] and
    /// as the fallback when volume data is unavailable.
    pub days_before_expiry: u8,
    /// Which calendar day the contract expires on.
    pub anchor: ExpiryAnchor,
    /// Delivery months the root trades, in calendar order (e.g. H, M, U, Z).
    pub cycle: Vec<ContractMonth>,
}

impl RolloverRule {
    /// The quarterly equity-index cycle with third-Friday expiry, rolling
    /// eight days out. Matches ES/NQ behaviour closely enough for defaults.
    #[must_use]
    pub fn quarterly_index() -> Self {
        Self {
            trigger: RolloverTrigger::DaysBeforeExpiry,
            days_before_expiry: 8,
            anchor: ExpiryAnchor::ThirdFriday,
            cycle: vec![
                ContractMonth::H,
                ContractMonth::M,
                ContractMonth::U,
                ContractMonth::Z,
            ],
        }
    }
}

/// Exponential backoff configuration for retrying transient provider failures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Minimum backoff delay in milliseconds.
    pub min_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,
    /// Exponential factor to increase delay after each failure (>= 1).
    pub factor: u32,
    /// Random jitter percentage [0, 100] added to each delay.
    pub jitter_percent: u8,
}

impl BackoffConfig {
    /// Base delay for the given zero-indexed attempt, before jitter.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.factor.max(1)).saturating_pow(attempt);
        let ms = self
            .min_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_backoff_ms: 250,
            max_backoff_ms: 10_000,
            factor: 2,
            jitter_percent: 20,
        }
    }
}

/// Per-query options accepted by the cache service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Resolve continuous futures roots to the front contract before querying.
    pub resolve_continuous: bool,
}

/// Global configuration for the candela cache service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandelaConfig {
    /// Ordered provider identifiers; lower index is higher priority. Providers
    /// absent from the list rank after all listed ones.
    pub provider_priority: Vec<String>,
    /// Per-timeframe TTL overrides.
    pub freshness: FreshnessPolicy,
    /// Hot-tier entry cap; eviction is least-recently-used.
    pub hot_cache_capacity: u64,
    /// Cold store connection string (`sqlite:<path>` or `sqlite::memory:`).
    pub cold_store_url: String,
    /// Per-futures-root rollover rules.
    pub rollover: HashMap<String, RolloverRule>,
    /// Timeout for individual provider requests.
    pub provider_timeout: Duration,
    /// Optional overall deadline for a single query's refresh work.
    pub request_timeout: Option<Duration>,
    /// Backoff settings for retrying transient provider failures.
    pub backoff: BackoffConfig,
    /// Bounded attempts per provider call before giving up on a sub-range.
    pub retry_attempts: u32,
}

impl Default for CandelaConfig {
    fn default() -> Self {
        let mut rollover = HashMap::new();
        rollover.insert("ES".to_string(), RolloverRule::quarterly_index());
        rollover.insert("NQ".to_string(), RolloverRule::quarterly_index());
        Self {
            provider_priority: Vec::new(),
            freshness: FreshnessPolicy::default(),
            hot_cache_capacity: 10_000,
            cold_store_url: "sqlite::memory:".to_string(),
            rollover,
            provider_timeout: Duration::from_secs(5),
            request_timeout: None,
            backoff: BackoffConfig::default(),
            retry_attempts: 3,
        }
    }
}

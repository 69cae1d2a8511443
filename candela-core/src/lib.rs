//! candela-core
//!
//! Core traits and algorithms shared across the candela ecosystem.
//!
//! - `connector`: the `CandelaConnector` trait and capability provider traits.
//! - `timeseries`: pure aggregation of finer bars into coarser buckets.
//! - `symbol`: vendor-format normalization and contract-code parsing.
//! - `rollover`: continuous-future to front-contract resolution.
//! - `calendar`: RTH/ETH session windows with holiday and DST awareness.
//! - `merge`: deterministic winner selection across provider revisions.
//! - `bus`: in-process correction event fan-out.
//! - `freshness`: the stale-bar predicate.
#![warn(missing_docs)]

/// Connector capability traits and the primary `CandelaConnector` interface.
pub mod connector;
/// In-process fan-out of correction events.
pub mod bus;
/// Session calendar: trading-hour windows per symbol and date.
pub mod calendar;
/// Staleness predicate over cached bars.
pub mod freshness;
/// Deterministic merge of provider revisions.
pub mod merge;
/// Continuous-future front-month resolution.
pub mod rollover;
/// Symbol normalization.
pub mod symbol;
/// Aggregation of finer timeframes into coarser ones.
pub mod timeseries;

pub use bus::{EventBus, Subscription, Topic};
pub use connector::{BarProvider, CandelaConnector, QuoteProvider};
pub use freshness::is_stale;
pub use merge::{MergeDecision, ProviderRank, merge};
pub use symbol::SymbolNormalizer;
pub use timeseries::aggregate;

// Re-export the types layer so downstream crates can depend on candela-core only.
pub use candela_types::*;

/// Current wall-clock time as UTC milliseconds since the epoch.
#[must_use]
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

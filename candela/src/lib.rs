//! candela
//!
//! A read-through, revision-aware OHLCV bar cache that federates several
//! heterogeneous market-data providers behind a single query interface.
//!
//! The [`Candela`] service normalizes symbols, serves bar ranges from a
//! two-tier store, classifies stale and missing buckets under a per-timeframe
//! freshness policy, refreshes gaps through a priority-ordered composite of
//! provider adapters (aggregating finer cadences when no adapter serves the
//! requested one natively), merges late corrections deterministically, and
//! notifies subscribers of every bar revision exactly once.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use candela::{Candela, QueryOptions, Timeframe};
//!
//! let service = Candela::builder()
//!     .with_connector(Arc::new(polygon))
//!     .with_connector(Arc::new(yahoo))
//!     .provider_priority(["polygon", "yahoo"])
//!     .store_url("sqlite:bars.db")
//!     .build()?;
//!
//! let _sub = service.subscribe(|event| println!("correction: {event:?}"));
//! let result = service
//!     .query("ES=F", Timeframe::M5, from, to, QueryOptions::default())
//!     .await?;
//! ```
#![warn(missing_docs)]

mod core;
mod flight;
mod router;
mod service;

pub use crate::core::{Candela, CandelaBuilder};
pub use crate::router::{RouteAttempt, RouteOutcome, RouteReport};
pub use crate::service::QueryResult;

pub use candela_core::{
    Bar, BarRequest, BackoffConfig, CachedBar, CandelaConfig, CandelaError, CanonicalSymbol,
    Capability, ContractMonth, CorrectionEvent, CorrectionKind, ExpiryAnchor, FreshnessPolicy,
    ProviderCapabilities, QueryOptions, QuoteTick, RolloverRule, RolloverTrigger, Subscription,
    Timeframe,
};
pub use candela_core::connector::{BarProvider, CandelaConnector, QuoteProvider};

//! Candela-specific data transfer objects and configuration primitives.
#![warn(missing_docs)]

mod bar;
mod capability;
mod config;
mod error;
mod event;
mod freshness;
mod symbol;
mod timeframe;

pub use bar::{Bar, BarRequest, CachedBar, QuoteTick};
pub use capability::{Capability, ProviderCapabilities};
pub use config::{
    BackoffConfig, CandelaConfig, ExpiryAnchor, QueryOptions, RolloverRule, RolloverTrigger,
};
pub use error::CandelaError;
pub use event::{CorrectionEvent, CorrectionKind};
pub use freshness::FreshnessPolicy;
pub use symbol::{CanonicalSymbol, ContractMonth};
pub use timeframe::Timeframe;

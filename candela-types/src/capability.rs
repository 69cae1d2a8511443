use core::fmt;

use serde::{Deserialize, Serialize};

use crate::timeframe::Timeframe;

/// High-level capability labels for routing, errors, and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Capability {
    /// Historical OHLCV bars.
    Bars,
    /// Point-in-time quote.
    Quote,
}

impl Capability {
    /// Stable, kebab-case identifier for logs/errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bars => "bars",
            Self::Quote => "quote",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of what a provider adapter can serve.
///
/// The composite router consults this to filter and rank adapters; it never
/// changes for the lifetime of a connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    /// Cadences the adapter serves natively, without aggregation.
    pub supported_timeframes: Vec<Timeframe>,
    /// Maximum bars the backend returns per request; larger windows are
    /// chunked by the router.
    pub max_bars_per_request: usize,
    /// Whether the backend needs credentials.
    pub requires_auth: bool,
    /// Advertised request budget per minute, if the vendor documents one.
    pub rate_limit_per_minute: Option<u32>,
    /// Whether the adapter can serve extended-hours bars.
    pub supports_extended_hours: bool,
    /// Earliest timestamp (UTC ms) for which the backend has history.
    pub earliest_historical_ts: Option<i64>,
    /// Adapter-declared priority; lower is preferred. Only used when no
    /// explicit provider priority list is configured.
    pub priority: u8,
}

impl ProviderCapabilities {
    /// Whether the adapter serves `timeframe` natively.
    #[must_use]
    pub fn supports(&self, timeframe: Timeframe) -> bool {
        self.supported_timeframes.contains(&timeframe)
    }

    /// The coarsest natively supported cadence that evenly divides `target`,
    /// used when the target itself is not native.
    #[must_use]
    pub fn finest_covering(&self, target: Timeframe) -> Option<Timeframe> {
        self.supported_timeframes
            .iter()
            .copied()
            .filter(|tf| tf.divides(target))
            .max_by_key(|tf| tf.duration_ms())
    }
}

impl Default for ProviderCapabilities {
    fn default() -> Self {
        Self {
            supported_timeframes: Vec::new(),
            max_bars_per_request: 10_000,
            requires_auth: false,
            rate_limit_per_minute: None,
            supports_extended_hours: false,
            earliest_historical_ts: None,
            priority: 100,
        }
    }
}

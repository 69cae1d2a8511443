use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::timeframe::Timeframe;

/// Per-timeframe time-to-live for cached bars.
///
/// The TTL bounds how long a stored revision is trusted before the service
/// re-asks providers. Bars older than [`FreshnessPolicy::HISTORICAL_CUTOFF`]
/// are considered finalized and never go stale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessPolicy {
    /// Per-timeframe overrides of the default TTL table.
    #[serde(default)]
    pub overrides: HashMap<Timeframe, Duration>,
}

impl FreshnessPolicy {
    /// Age past which bar data is treated as finalized (seven days).
    pub const HISTORICAL_CUTOFF: Duration = Duration::from_secs(7 * 24 * 3600);

    /// Default TTL for a timeframe when no override is configured.
    #[must_use]
    pub const fn default_ttl(timeframe: Timeframe) -> Duration {
        match timeframe {
            Timeframe::M1 => Duration::from_secs(5 * 60),
            Timeframe::M5 => Duration::from_secs(15 * 60),
            Timeframe::M10 => Duration::from_secs(20 * 60),
            Timeframe::M15 => Duration::from_secs(30 * 60),
            Timeframe::M30 => Duration::from_secs(60 * 60),
            Timeframe::H1 => Duration::from_secs(2 * 3600),
            Timeframe::H2 => Duration::from_secs(4 * 3600),
            Timeframe::H4 => Duration::from_secs(6 * 3600),
            Timeframe::D1 => Duration::from_secs(24 * 3600),
        }
    }

    /// Effective TTL for a timeframe under this policy.
    #[must_use]
    pub fn ttl_for(&self, timeframe: Timeframe) -> Duration {
        self.overrides
            .get(&timeframe)
            .copied()
            .unwrap_or_else(|| Self::default_ttl(timeframe))
    }

    /// Builder-style override for one timeframe.
    #[must_use]
    pub fn with_override(mut self, timeframe: Timeframe, ttl: Duration) -> Self {
        self.overrides.insert(timeframe, ttl);
        self
    }
}

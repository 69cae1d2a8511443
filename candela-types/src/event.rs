use core::fmt;

use serde::{Deserialize, Serialize};

use crate::bar::CachedBar;
use crate::timeframe::Timeframe;

/// Classification of a bar write that changed observable cache state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrectionKind {
    /// First bar ever stored for the timestamp.
    #[serde(rename = "initial")]
    Initial,
    /// Same provider superseded its own earlier revision.
    #[serde(rename = "revision")]
    Revision,
    /// A higher-priority provider displaced a lower-priority one.
    #[serde(rename = "provider_override")]
    ProviderOverride,
}

impl CorrectionKind {
    /// Stable identifier used in storage and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Revision => "revision",
            Self::ProviderOverride => "provider_override",
        }
    }
}

impl fmt::Display for CorrectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitted exactly once per bar write that actually changed the winning bar
/// for a `(symbol, timeframe, timestamp)` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionEvent {
    /// Canonical symbol string.
    pub symbol: String,
    /// Cadence of the corrected bar.
    pub timeframe: Timeframe,
    /// Bucket start, UTC ms.
    pub ts: i64,
    /// The previously winning bar, if any.
    pub old: Option<CachedBar>,
    /// The bar that now wins for the key.
    pub new: CachedBar,
    /// What kind of change occurred.
    pub kind: CorrectionKind,
    /// UTC ms when the cache detected the change.
    pub detected_at: i64,
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CandelaError;
use crate::symbol::CanonicalSymbol;
use crate::timeframe::Timeframe;

/// One OHLCV sample aligned to a timeframe bucket.
///
/// Timestamps are UTC milliseconds since the epoch, aligned to the start of
/// the bucket. Prices are decimals; volume is non-negative by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    /// Bucket start, UTC ms since epoch.
    pub ts: i64,
    /// Opening price.
    pub open: Decimal,
    /// Highest traded price within the bucket.
    pub high: Decimal,
    /// Lowest traded price within the bucket.
    pub low: Decimal,
    /// Closing price.
    pub close: Decimal,
    /// Traded volume within the bucket.
    pub volume: u64,
}

impl Bar {
    /// Check the OHLC shape invariants without looking at the timeframe grid.
    #[must_use]
    pub fn is_valid_ohlc(&self) -> bool {
        self.low <= self.open.min(self.close)
            && self.high >= self.open.max(self.close)
            && self.low <= self.high
    }

    /// Validate the full bar contract for a given timeframe.
    ///
    /// # Errors
    /// Returns `CandelaError::Data` when the OHLC shape is violated or the
    /// timestamp is not aligned to the timeframe grid.
    pub fn validate(&self, timeframe: Timeframe) -> Result<(), CandelaError> {
        if !self.is_valid_ohlc() {
            return Err(CandelaError::Data(format!(
                "bar at {} violates OHLC invariants (o={} h={} l={} c={})",
                self.ts, self.open, self.high, self.low, self.close
            )));
        }
        if self.ts.rem_euclid(timeframe.duration_ms()) != 0 {
            return Err(CandelaError::Data(format!(
                "bar timestamp {} is not aligned to the {} grid",
                self.ts, timeframe
            )));
        }
        Ok(())
    }
}

/// A stored bar plus provenance: which provider produced it, at which
/// revision, and when the cache observed it.
///
/// For a fixed `(symbol, timeframe, timestamp, provider)` the revision is
/// strictly increasing across writes; a higher revision is never replaced by
/// a lower one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedBar {
    /// The underlying OHLCV sample.
    pub bar: Bar,
    /// Short provider identifier (e.g. `"polygon"`, `"yahoo"`).
    pub provider: String,
    /// Monotone per-provider revision, starting at 1.
    pub revision: u32,
    /// UTC ms when this revision was observed by the cache.
    pub fetched_at: i64,
}

impl CachedBar {
    /// Bucket start of the underlying bar, UTC ms.
    #[must_use]
    pub const fn ts(&self) -> i64 {
        self.bar.ts
    }
}

/// Parameters for a historical bar fetch against a single provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarRequest {
    /// Canonical symbol to fetch.
    pub symbol: CanonicalSymbol,
    /// Requested cadence.
    pub timeframe: Timeframe,
    /// Inclusive start of the window, UTC ms.
    pub from: i64,
    /// Inclusive end of the window, UTC ms.
    pub to: i64,
    /// Optional cap on the number of bars returned.
    pub limit: Option<usize>,
}

impl BarRequest {
    /// Number of grid timestamps the window spans for the requested cadence.
    #[must_use]
    pub const fn expected_bars(&self) -> usize {
        let step = self.timeframe.duration_ms();
        let first = self.timeframe.ceil(self.from);
        if first > self.to {
            return 0;
        }
        (((self.to - first) / step) + 1) as usize
    }
}

/// A point-in-time quote from a live-capable provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTick {
    /// Last traded or indicative price.
    pub price: Decimal,
    /// Quote time, UTC ms.
    pub ts: i64,
}

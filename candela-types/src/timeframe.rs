use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CandelaError;

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 86_400_000;

/// The closed set of bar cadences served by the cache.
///
/// Each timeframe has a fixed duration; bar timestamps are always aligned to
/// the start of their bucket (`ts % duration_ms() == 0`). `M10`, `H2` and `H4`
/// are aggregation cadences that many vendors do not serve natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    /// One minute.
    #[serde(rename = "1m")]
    M1,
    /// Five minutes.
    #[serde(rename = "5m")]
    M5,
    /// Ten minutes.
    #[serde(rename = "10m")]
    M10,
    /// Fifteen minutes.
    #[serde(rename = "15m")]
    M15,
    /// Thirty minutes.
    #[serde(rename = "30m")]
    M30,
    /// One hour.
    #[serde(rename = "1h")]
    H1,
    /// Two hours.
    #[serde(rename = "2h")]
    H2,
    /// Four hours.
    #[serde(rename = "4h")]
    H4,
    /// One day.
    #[serde(rename = "1D")]
    D1,
}

impl Timeframe {
    /// Every timeframe, ordered from finest to coarsest.
    pub const ALL: &'static [Self] = &[
        Self::M1,
        Self::M5,
        Self::M10,
        Self::M15,
        Self::M30,
        Self::H1,
        Self::H2,
        Self::H4,
        Self::D1,
    ];

    /// Bucket duration in milliseconds.
    #[must_use]
    pub const fn duration_ms(self) -> i64 {
        match self {
            Self::M1 => MINUTE_MS,
            Self::M5 => 5 * MINUTE_MS,
            Self::M10 => 10 * MINUTE_MS,
            Self::M15 => 15 * MINUTE_MS,
            Self::M30 => 30 * MINUTE_MS,
            Self::H1 => HOUR_MS,
            Self::H2 => 2 * HOUR_MS,
            Self::H4 => 4 * HOUR_MS,
            Self::D1 => DAY_MS,
        }
    }

    /// Stable identifier used in configuration, storage, and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M10 => "10m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H2 => "2h",
            Self::H4 => "4h",
            Self::D1 => "1D",
        }
    }

    /// Whether this cadence is finer than one day.
    #[must_use]
    pub const fn is_intraday(self) -> bool {
        !matches!(self, Self::D1)
    }

    /// True when `self` evenly divides `target` and is strictly finer.
    #[must_use]
    pub const fn divides(self, target: Self) -> bool {
        let s = self.duration_ms();
        let t = target.duration_ms();
        s < t && t % s == 0
    }

    /// Align a timestamp down to the start of its bucket.
    #[must_use]
    pub const fn floor(self, ts: i64) -> i64 {
        ts - ts.rem_euclid(self.duration_ms())
    }

    /// Align a timestamp up to the nearest bucket start at or after it.
    #[must_use]
    pub const fn ceil(self, ts: i64) -> i64 {
        let floored = self.floor(ts);
        if floored == ts { ts } else { floored + self.duration_ms() }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = CandelaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Self::M1),
            "5m" => Ok(Self::M5),
            "10m" => Ok(Self::M10),
            "15m" => Ok(Self::M15),
            "30m" => Ok(Self::M30),
            "1h" => Ok(Self::H1),
            "2h" => Ok(Self::H2),
            "4h" => Ok(Self::H4),
            "1D" | "1d" => Ok(Self::D1),
            other => Err(CandelaError::UnknownTimeframe(other.to_string())),
        }
    }
}

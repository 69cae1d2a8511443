use chrono::{Datelike, Days, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use candela_types::CanonicalSymbol;

/// Calendar coverage range. Queries outside it are answered best-effort from
/// the weekday rules alone and flagged as approximate.
pub const VALID_FROM: (i32, u32, u32) = (2024, 1, 1);
/// Inclusive end of the holiday table's coverage.
pub const VALID_TO: (i32, u32, u32) = (2026, 12, 31);

/// A half-open UTC window in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Window start, UTC ms.
    pub start: i64,
    /// Window end, UTC ms.
    pub end: i64,
}

/// Which part of the trading day a window belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Regular trading hours.
    Rth,
    /// Extended hours before the open.
    EthPre,
    /// Extended hours after the close.
    EthPost,
}

/// One trading session window for a (symbol, date).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    /// Session classification.
    pub kind: SessionKind,
    /// UTC window of the session.
    pub window: TimeWindow,
    /// Exchange the window belongs to.
    pub exchange: &'static str,
}

/// The sessions of one calendar date for a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDay {
    /// Session windows, ascending by start. Empty on full closures.
    pub sessions: Vec<Session>,
    /// True when the date falls outside the holiday table's validity range.
    pub approximate: bool,
}

// Full-closure dates shared by US equity and equity-index futures markets.
const FULL_CLOSURES: &[(i32, u32, u32)] = &[
    // 2024
    (2024, 1, 1),
    (2024, 1, 15),
    (2024, 2, 19),
    (2024, 3, 29),
    (2024, 5, 27),
    (2024, 6, 19),
    (2024, 7, 4),
    (2024, 9, 2),
    (2024, 11, 28),
    (2024, 12, 25),
    // 2025
    (2025, 1, 1),
    (2025, 1, 20),
    (2025, 2, 17),
    (2025, 4, 18),
    (2025, 5, 26),
    (2025, 6, 19),
    (2025, 7, 4),
    (2025, 9, 1),
    (2025, 11, 27),
    (2025, 12, 25),
    // 2026
    (2026, 1, 1),
    (2026, 1, 19),
    (2026, 2, 16),
    (2026, 4, 3),
    (2026, 5, 25),
    (2026, 6, 19),
    (2026, 7, 3),
    (2026, 9, 7),
    (2026, 11, 26),
    (2026, 12, 25),
];

const EARLY_CLOSES: &[(i32, u32, u32)] = &[
    (2024, 7, 3),
    (2024, 11, 29),
    (2024, 12, 24),
    (2025, 7, 3),
    (2025, 11, 28),
    (2025, 12, 24),
    (2026, 11, 27),
    (2026, 12, 24),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Market {
    Nyse,
    Cme,
}

impl Market {
    fn for_symbol(symbol: &CanonicalSymbol) -> Self {
        match symbol {
            CanonicalSymbol::Ticker(_) => Self::Nyse,
            CanonicalSymbol::Continuous(_) | CanonicalSymbol::Contract { .. } => Self::Cme,
        }
    }

    const fn exchange(self) -> &'static str {
        match self {
            Self::Nyse => "NYSE",
            Self::Cme => "CME",
        }
    }

    fn tz(self) -> Tz {
        match self {
            Self::Nyse => chrono_tz::America::New_York,
            Self::Cme => chrono_tz::America::Chicago,
        }
    }

    const fn rth(self) -> ((u32, u32), (u32, u32)) {
        match self {
            Self::Nyse => ((9, 30), (16, 0)),
            Self::Cme => ((8, 30), (15, 0)),
        }
    }

    const fn early_close(self) -> (u32, u32) {
        match self {
            Self::Nyse => (13, 0),
            Self::Cme => (12, 15),
        }
    }
}

fn ymd(t: (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(t.0, t.1, t.2).unwrap_or(NaiveDate::MIN)
}

fn matches_table(table: &[(i32, u32, u32)], date: NaiveDate) -> bool {
    table
        .iter()
        .any(|&(y, m, d)| date.year() == y && date.month() == m && date.day() == d)
}

// DST transitions resolve through chrono-tz's embedded IANA tables. The
// spring-forward gap cannot contain any session boundary used here, so the
// None branch only guards against table drift.
fn utc_ms(date: NaiveDate, (h, m): (u32, u32), tz: Tz) -> i64 {
    let Some(naive) = date.and_hms_opt(h, m, 0) else {
        return 0;
    };
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc).timestamp_millis(),
        chrono::LocalResult::Ambiguous(first, _) => first.with_timezone(&Utc).timestamp_millis(),
        chrono::LocalResult::None => {
            (naive + chrono::Duration::hours(1)).and_utc().timestamp_millis()
        }
    }
}

/// Whether the date is a full-closure holiday for the symbol's market.
///
/// US equity and equity-index futures markets currently share one closure
/// table, so the symbol only selects the market profile.
#[must_use]
pub fn is_holiday(date: NaiveDate, _symbol: &CanonicalSymbol) -> bool {
    matches_table(FULL_CLOSURES, date)
}

/// Session windows for a (date, symbol), all times UTC ms.
///
/// Returns no sessions on weekends and full closures, and a truncated RTH on
/// early-close days. Dates outside the holiday table's validity range are
/// answered from weekday rules alone with `approximate = true`.
#[must_use]
pub fn sessions_for(date: NaiveDate, symbol: &CanonicalSymbol) -> SessionDay {
    let market = Market::for_symbol(symbol);
    let approximate = date < ymd(VALID_FROM) || date > ymd(VALID_TO);

    let closed_weekday = match market {
        Market::Nyse => matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        // CME equity index trades Sunday evening into Friday; the Sunday
        // overnight window is attributed to Monday here.
        Market::Cme => matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
    };
    if closed_weekday || (!approximate && matches_table(FULL_CLOSURES, date)) {
        return SessionDay {
            sessions: Vec::new(),
            approximate,
        };
    }

    let early = !approximate && matches_table(EARLY_CLOSES, date);
    let tz = market.tz();
    let exchange = market.exchange();
    let ((open_h, open_m), (close_h, close_m)) = market.rth();
    let close = if early {
        market.early_close()
    } else {
        (close_h, close_m)
    };

    let rth = Session {
        kind: SessionKind::Rth,
        window: TimeWindow {
            start: utc_ms(date, (open_h, open_m), tz),
            end: utc_ms(date, close, tz),
        },
        exchange,
    };

    let mut sessions = Vec::with_capacity(3);
    match market {
        Market::Nyse => {
            sessions.push(Session {
                kind: SessionKind::EthPre,
                window: TimeWindow {
                    start: utc_ms(date, (4, 0), tz),
                    end: rth.window.start,
                },
                exchange,
            });
            sessions.push(rth);
            if !early {
                sessions.push(Session {
                    kind: SessionKind::EthPost,
                    window: TimeWindow {
                        start: rth.window.end,
                        end: utc_ms(date, (20, 0), tz),
                    },
                    exchange,
                });
            }
        }
        Market::Cme => {
            let prev = date.checked_sub_days(Days::new(1)).unwrap_or(date);
            sessions.push(Session {
                kind: SessionKind::EthPre,
                window: TimeWindow {
                    start: utc_ms(prev, (17, 0), tz),
                    end: rth.window.start,
                },
                exchange,
            });
            sessions.push(rth);
            if !early {
                sessions.push(Session {
                    kind: SessionKind::EthPost,
                    window: TimeWindow {
                        start: rth.window.end,
                        end: utc_ms(date, (16, 0), tz),
                    },
                    exchange,
                });
            }
        }
    }

    SessionDay {
        sessions,
        approximate,
    }
}

/// The regular-trading-hours window for a (date, symbol), if the market opens.
#[must_use]
pub fn rth_window(date: NaiveDate, symbol: &CanonicalSymbol) -> Option<TimeWindow> {
    sessions_for(date, symbol)
        .sessions
        .into_iter()
        .find(|s| s.kind == SessionKind::Rth)
        .map(|s| s.window)
}

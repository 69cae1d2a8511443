use candela_core::calendar::{SessionKind, is_holiday, rth_window, sessions_for};
use candela_types::CanonicalSymbol;
use chrono::NaiveDate;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn aapl() -> CanonicalSymbol {
    CanonicalSymbol::Ticker("AAPL".into())
}

fn es() -> CanonicalSymbol {
    CanonicalSymbol::Continuous("ES".into())
}

const HOUR_MS: i64 = 3_600_000;

#[test]
fn nyse_regular_day_has_three_sessions() {
    // 2025-03-05 is a Wednesday before the DST switch (EST, UTC-5).
    let day = sessions_for(d(2025, 3, 5), &aapl());
    assert!(!day.approximate);
    let kinds: Vec<SessionKind> = day.sessions.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![SessionKind::EthPre, SessionKind::Rth, SessionKind::EthPost]
    );

    let rth = rth_window(d(2025, 3, 5), &aapl()).unwrap();
    // 09:30 EST == 14:30 UTC; 16:00 EST == 21:00 UTC.
    let midnight_utc = d(2025, 3, 5).and_hms_opt(0, 0, 0).unwrap().and_utc();
    assert_eq!(rth.start, midnight_utc.timestamp_millis() + 14 * HOUR_MS + 30 * 60_000);
    assert_eq!(rth.end, midnight_utc.timestamp_millis() + 21 * HOUR_MS);
}

#[test]
fn dst_shift_moves_utc_open() {
    // 2025-07-07 is a Monday in EDT (UTC-4): open at 13:30 UTC.
    let rth = rth_window(d(2025, 7, 7), &aapl()).unwrap();
    let midnight_utc = d(2025, 7, 7).and_hms_opt(0, 0, 0).unwrap().and_utc();
    assert_eq!(rth.start, midnight_utc.timestamp_millis() + 13 * HOUR_MS + 30 * 60_000);
}

#[test]
fn weekends_and_holidays_are_closed() {
    assert!(sessions_for(d(2025, 3, 8), &aapl()).sessions.is_empty());
    assert!(sessions_for(d(2025, 12, 25), &aapl()).sessions.is_empty());
    assert!(is_holiday(d(2025, 12, 25), &aapl()));
    assert!(!is_holiday(d(2025, 3, 5), &aapl()));
    assert!(rth_window(d(2025, 12, 25), &aapl()).is_none());
}

#[test]
fn early_close_truncates_rth_and_drops_the_post_session() {
    // Friday after Thanksgiving 2025: 13:00 EST close == 18:00 UTC.
    let day = sessions_for(d(2025, 11, 28), &aapl());
    let kinds: Vec<SessionKind> = day.sessions.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![SessionKind::EthPre, SessionKind::Rth]);
    let rth = rth_window(d(2025, 11, 28), &aapl()).unwrap();
    let midnight_utc = d(2025, 11, 28).and_hms_opt(0, 0, 0).unwrap().and_utc();
    assert_eq!(rth.end, midnight_utc.timestamp_millis() + 18 * HOUR_MS);
}

#[test]
fn cme_overnight_session_starts_the_previous_evening() {
    // 2025-03-05 in CST (UTC-6): pre opens 2025-03-04 17:00 CST == 23:00 UTC.
    let day = sessions_for(d(2025, 3, 5), &es());
    let pre = &day.sessions[0];
    assert_eq!(pre.kind, SessionKind::EthPre);
    assert_eq!(pre.exchange, "CME");
    let prev_midnight = d(2025, 3, 4).and_hms_opt(0, 0, 0).unwrap().and_utc();
    assert_eq!(pre.window.start, prev_midnight.timestamp_millis() + 23 * HOUR_MS);
    // RTH mirrors the equity session: 08:30 CST == 14:30 UTC.
    let rth = rth_window(d(2025, 3, 5), &es()).unwrap();
    let midnight = d(2025, 3, 5).and_hms_opt(0, 0, 0).unwrap().and_utc();
    assert_eq!(rth.start, midnight.timestamp_millis() + 14 * HOUR_MS + 30 * 60_000);
}

#[test]
fn out_of_range_dates_are_flagged_best_effort() {
    let day = sessions_for(d(2031, 6, 4), &aapl());
    assert!(day.approximate);
    // Weekday rules still apply.
    assert!(!day.sessions.is_empty());
    assert!(sessions_for(d(2031, 6, 7), &aapl()).sessions.is_empty());
}

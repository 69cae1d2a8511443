use rust_decimal::Decimal;

use candela_core::{Bar, Timeframe};

fn seed_of(symbol: &str) -> i64 {
    symbol.bytes().fold(7i64, |acc, b| {
        acc.wrapping_mul(31).wrapping_add(i64::from(b))
    })
}

/// Deterministic OHLCV bars on the timeframe grid covering `[from, to]`.
///
/// The series is a pure function of (symbol, timeframe, timestamp), so
/// repeated fetches return byte-identical bars and tests can assert exact
/// values.
#[must_use]
pub fn bars_for(symbol: &str, timeframe: Timeframe, from: i64, to: i64) -> Vec<Bar> {
    let step = timeframe.duration_ms();
    let seed = seed_of(symbol).abs();
    let base_cents = 10_000 + (seed % 400) * 100;

    let mut out = Vec::new();
    let mut ts = timeframe.ceil(from);
    while ts <= to {
        let i = ts / step;
        let drift = (i.wrapping_mul(17).wrapping_add(seed)) % 200 - 100;
        let spread = (i.wrapping_mul(13)) % 40 + 10;
        let open = base_cents + drift;
        let close = base_cents + ((i.wrapping_mul(29).wrapping_add(seed)) % 200 - 100);
        let high = open.max(close) + spread;
        let low = open.min(close) - spread;
        out.push(Bar {
            ts,
            open: Decimal::new(open, 2),
            high: Decimal::new(high, 2),
            low: Decimal::new(low, 2),
            close: Decimal::new(close, 2),
            volume: u64::try_from(1_000 + (i % 500) * 10).unwrap_or(1_000),
        });
        ts += step;
    }
    out
}

use candela_core::aggregate;
use candela_types::{Bar, CandelaError, Timeframe};
use rust_decimal::Decimal;

fn px(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn bar(ts: i64, o: i64, h: i64, l: i64, c: i64, v: u64) -> Bar {
    Bar {
        ts,
        open: px(o),
        high: px(h),
        low: px(l),
        close: px(c),
        volume: v,
    }
}

const M5: i64 = 5 * 60_000;

#[test]
fn folds_five_minute_bars_into_ten_minute_buckets() {
    let bars: Vec<Bar> = (0..12)
        .map(|i| {
            bar(
                i * M5,
                10_000 + i,
                10_100 + i,
                9_900 - i,
                10_050 + i,
                1_000,
            )
        })
        .collect();

    let out = aggregate(&bars, Timeframe::M5, Timeframe::M10).unwrap();
    assert_eq!(out.len(), 6);
    for (j, agg) in out.iter().enumerate() {
        let j = j as i64;
        assert_eq!(agg.ts, j * 2 * M5);
        assert_eq!(agg.open, px(10_000 + 2 * j));
        assert_eq!(agg.close, px(10_050 + 2 * j + 1));
        assert_eq!(agg.high, px(10_100 + 2 * j + 1));
        assert_eq!(agg.low, px(9_900 - 2 * j - 1));
        assert_eq!(agg.volume, 2_000);
    }
}

#[test]
fn drops_a_partial_trailing_bucket() {
    // Eleven 5m bars: five full 10m buckets plus one trailing half bucket.
    let bars: Vec<Bar> = (0..11)
        .map(|i| bar(i * M5, 100, 110, 90, 105, 10))
        .collect();
    let out = aggregate(&bars, Timeframe::M5, Timeframe::M10).unwrap();
    assert_eq!(out.len(), 5);
    assert_eq!(out.last().unwrap().ts, 8 * M5);
}

#[test]
fn keeps_interior_buckets_with_holes() {
    // A hole mid-series starts a new bucket; only the trailing bucket is
    // subject to the completeness check.
    let bars = vec![
        bar(0, 1, 2, 1, 2, 5),
        // gap where the second half of bucket 0 would be
        bar(2 * M5, 3, 4, 2, 3, 5),
        bar(3 * M5, 3, 5, 3, 4, 5),
    ];
    let out = aggregate(&bars, Timeframe::M5, Timeframe::M10).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].volume, 5);
    assert_eq!(out[1].volume, 10);
}

#[test]
fn rejects_non_divisor_source() {
    let bars = vec![bar(0, 1, 1, 1, 1, 1)];
    let err = aggregate(&bars, Timeframe::M15, Timeframe::M10).unwrap_err();
    assert!(matches!(err, CandelaError::InvalidArg(_)));
}

#[test]
fn rejects_unsorted_input() {
    let bars = vec![bar(M5, 1, 1, 1, 1, 1), bar(0, 1, 1, 1, 1, 1)];
    let err = aggregate(&bars, Timeframe::M5, Timeframe::M10).unwrap_err();
    assert!(matches!(err, CandelaError::InvalidArg(_)));
}

#[test]
fn empty_input_yields_empty_output() {
    let out = aggregate(&[], Timeframe::M1, Timeframe::M5).unwrap();
    assert!(out.is_empty());
}

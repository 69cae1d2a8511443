use candela_types::{Bar, CandelaError, Timeframe};

struct BucketAgg {
    start: i64,
    open: rust_decimal::Decimal,
    high: rust_decimal::Decimal,
    low: rust_decimal::Decimal,
    close: rust_decimal::Decimal,
    volume: u64,
    count: usize,
}

impl BucketAgg {
    fn begin(start: i64, bar: &Bar) -> Self {
        Self {
            start,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            count: 1,
        }
    }

    fn absorb(&mut self, bar: &Bar) {
        if bar.high > self.high {
            self.high = bar.high;
        }
        if bar.low < self.low {
            self.low = bar.low;
        }
        self.close = bar.close;
        self.volume = self.volume.saturating_add(bar.volume);
        self.count += 1;
    }

    fn finish(self) -> Bar {
        Bar {
            ts: self.start,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// Fold a sequence of finer bars into the target timeframe.
///
/// Bars are grouped by `floor(ts / target_ms) * target_ms`; within a bucket
/// `open` is the first open, `close` the last close, `high`/`low` the
/// extremes, and `volume` the sum. The trailing bucket is dropped when it does
/// not contain a full complement of source bars.
///
/// # Errors
/// - `InvalidArg` when the source cadence does not evenly divide the target,
///   or the input is not strictly ascending by timestamp.
pub fn aggregate(
    bars: &[Bar],
    source: Timeframe,
    target: Timeframe,
) -> Result<Vec<Bar>, CandelaError> {
    if !source.divides(target) {
        return Err(CandelaError::InvalidArg(format!(
            "{source} does not evenly divide {target}"
        )));
    }
    let per_bucket = (target.duration_ms() / source.duration_ms()) as usize;

    let mut out: Vec<Bar> = Vec::with_capacity(bars.len() / per_bucket + 1);
    let mut current: Option<BucketAgg> = None;
    let mut prev_ts: Option<i64> = None;

    for bar in bars {
        if prev_ts.is_some_and(|p| bar.ts <= p) {
            return Err(CandelaError::InvalidArg(format!(
                "aggregation input must be strictly ascending (saw {} after {:?})",
                bar.ts, prev_ts
            )));
        }
        prev_ts = Some(bar.ts);

        let bucket = target.floor(bar.ts);
        match current.as_mut() {
            Some(agg) if agg.start == bucket => agg.absorb(bar),
            Some(_) => {
                let done = current.take().map(BucketAgg::finish);
                out.extend(done);
                current = Some(BucketAgg::begin(bucket, bar));
            }
            None => current = Some(BucketAgg::begin(bucket, bar)),
        }
    }

    // The trailing bucket only counts when it is complete.
    if let Some(agg) = current
        && agg.count == per_bucket
    {
        out.push(agg.finish());
    }

    Ok(out)
}

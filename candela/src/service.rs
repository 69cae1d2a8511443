use std::sync::Arc;

use futures::FutureExt;

use candela_core::bus::{EventBus, Topic};
use candela_core::freshness::is_stale;
use candela_core::{
    CachedBar, CandelaError, CanonicalSymbol, CorrectionEvent, QueryOptions, QuoteTick, Timeframe,
    now_ms, rollover,
};
use candela_store::TieredStore;

use crate::core::Candela;
use crate::router::{Composite, RouteReport};

/// What a query returns: the merged bars plus partial-result metadata.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Winning bars ascending by timestamp, one per grid timestamp that any
    /// tier or provider could supply.
    pub bars: Vec<CachedBar>,
    /// True when some sub-range could not be refreshed; the bars are the
    /// best the store has.
    pub partial: bool,
    /// Why the result is partial, when it is.
    pub reason: Option<String>,
    /// Route metadata for every refresh this call led or joined.
    pub routes: Vec<RouteReport>,
}

// One coalesced refresh of a (symbol, timeframe, sub-range): fetch through
// the composite, validate, persist, publish. Owns everything so it can run
// as a shared single-flight future.
struct RefreshJob {
    composite: Arc<Composite>,
    store: Arc<TieredStore>,
    bus: Arc<EventBus>,
    symbol: CanonicalSymbol,
    key: String,
    timeframe: Timeframe,
    from: i64,
    to: i64,
}

impl RefreshJob {
    async fn run(self) -> Result<RouteReport, CandelaError> {
        let (bars, report) = self
            .composite
            .fetch_bars(&self.symbol, self.timeframe, self.from, self.to)
            .await?;
        let Some(provider) = report.served_by.clone() else {
            return Ok(report);
        };

        let mut valid = Vec::with_capacity(bars.len());
        for bar in bars {
            if let Err(e) = bar.validate(self.timeframe) {
                tracing::warn!(
                    target = "candela::service",
                    event = "corrupt_bar",
                    provider = %provider,
                    symbol = %self.key,
                    ts = bar.ts,
                    error = %e,
                    "dropping provider bar that violates OHLC invariants"
                );
                continue;
            }
            valid.push(bar);
        }

        let events = self
            .store
            .ingest(&self.key, self.timeframe, &provider, valid, now_ms())
            .await?;
        for event in &events {
            self.bus.publish(Topic::Correction, event);
        }
        tracing::debug!(
            target = "candela::service",
            event = "refresh",
            symbol = %self.key,
            timeframe = %self.timeframe,
            from = self.from,
            to = self.to,
            provider = %provider,
            corrections = events.len(),
            "refreshed sub-range"
        );
        Ok(report)
    }
}

impl Candela {
    /// Resolve the raw symbol, optionally rolling a continuous root to its
    /// front contract as of the query end.
    fn resolve_symbol(
        &self,
        raw: &str,
        opts: QueryOptions,
        as_of_ms: i64,
    ) -> Result<CanonicalSymbol, CandelaError> {
        let sym = self.normalizer.normalize(raw)?;
        if !opts.resolve_continuous {
            return Ok(sym);
        }
        let CanonicalSymbol::Continuous(root) = &sym else {
            return Ok(sym);
        };
        let rule = self.cfg.rollover.get(root).ok_or_else(|| {
            CandelaError::Symbol(format!("no rollover rule configured for root {root}"))
        })?;
        let as_of = chrono::DateTime::from_timestamp_millis(as_of_ms)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| {
                CandelaError::InvalidArg(format!("timestamp {as_of_ms} out of range"))
            })?;
        rollover::resolve_front_month(root, rule, as_of, None)
    }

    // Grid timestamps in [from, to] that are missing or stale, coalesced
    // into contiguous sub-ranges.
    fn plan_gaps(
        &self,
        existing: &[CachedBar],
        timeframe: Timeframe,
        from: i64,
        to: i64,
        now: i64,
    ) -> Vec<(i64, i64)> {
        let step = timeframe.duration_ms();
        let mut gaps: Vec<(i64, i64)> = Vec::new();
        let mut rows = existing.iter().peekable();
        let mut ts = timeframe.ceil(from);
        while ts <= to {
            while rows.peek().is_some_and(|b| b.ts() < ts) {
                rows.next();
            }
            let needs_refresh = match rows.peek() {
                Some(bar) if bar.ts() == ts => {
                    is_stale(bar, timeframe, &self.cfg.freshness, now)
                }
                _ => true,
            };
            if needs_refresh {
                match gaps.last_mut() {
                    Some((_, end)) if *end + step == ts => *end = ts,
                    _ => gaps.push((ts, ts)),
                }
            }
            ts += step;
        }
        gaps
    }

    /// Read-through bar query.
    ///
    /// Serves `[from, to]` (inclusive, UTC ms) at `timeframe`: whatever the
    /// store holds fresh comes straight back; stale and missing buckets are
    /// refreshed through the composite provider, merged under the revision
    /// rules, and corrections published before the final merged range is
    /// re-read and returned. Concurrent queries for the same sub-range share
    /// one provider call.
    ///
    /// Provider failures degrade to `partial = true` with the store's best
    /// data, and so do cold-tier read failures (served from the hot tier);
    /// store write failures fail the call.
    ///
    /// # Errors
    /// - `InvalidArg` on a reversed range; `Symbol` on malformed symbols.
    /// - `Store` when persisting refreshed bars fails.
    pub async fn query(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: i64,
        to: i64,
        opts: QueryOptions,
    ) -> Result<QueryResult, CandelaError> {
        if from > to {
            return Err(CandelaError::InvalidArg(format!(
                "reversed range: {from} > {to}"
            )));
        }
        let sym = self.resolve_symbol(symbol, opts, to)?;
        let key = sym.to_string();

        let refresh = self.refresh_window(&sym, &key, timeframe, from, to);
        let (partial, reason, routes) = match self.cfg.request_timeout {
            Some(deadline) => match tokio::time::timeout(deadline, refresh).await {
                Ok(done) => done?,
                Err(_) => (
                    true,
                    Some(
                        CandelaError::RequestTimeout {
                            capability: "bars",
                        }
                        .to_string(),
                    ),
                    Vec::new(),
                ),
            },
            None => refresh.await?,
        };

        match self.store.get_range(&key, timeframe, from, to).await {
            Ok(bars) => Ok(QueryResult {
                bars,
                partial,
                reason,
                routes,
            }),
            // Cold read failure degrades to whatever the hot tier holds.
            Err(e) => {
                tracing::warn!(
                    target = "candela::service",
                    event = "cold_read_failed",
                    symbol = %key,
                    timeframe = %timeframe,
                    error = %e,
                    "serving best-effort range from the hot tier"
                );
                Ok(QueryResult {
                    bars: self.store.hot_range(&key, timeframe, from, to),
                    partial: true,
                    reason: Some(e.to_string()),
                    routes,
                })
            }
        }
    }

    async fn refresh_window(
        &self,
        sym: &CanonicalSymbol,
        key: &str,
        timeframe: Timeframe,
        from: i64,
        to: i64,
    ) -> Result<(bool, Option<String>, Vec<RouteReport>), CandelaError> {
        let existing = match self.store.get_range(key, timeframe, from, to).await {
            Ok(bars) => bars,
            // Plan from the hot tier alone; if providers then deliver, the
            // write path decides whether the store has recovered.
            Err(e) => {
                tracing::warn!(
                    target = "candela::service",
                    event = "cold_read_failed",
                    symbol = %key,
                    timeframe = %timeframe,
                    error = %e,
                    "planning refresh from the hot tier"
                );
                self.store.hot_range(key, timeframe, from, to)
            }
        };
        let gaps = self.plan_gaps(&existing, timeframe, from, to, now_ms());

        let mut partial = false;
        let mut reason: Option<String> = None;
        let mut routes = Vec::with_capacity(gaps.len());

        for (start, end) in gaps {
            let job = RefreshJob {
                composite: Arc::clone(&self.composite),
                store: Arc::clone(&self.store),
                bus: Arc::clone(&self.bus),
                symbol: sym.clone(),
                key: key.to_string(),
                timeframe,
                from: start,
                to: end,
            };
            let outcome = self
                .flights
                .run((key.to_string(), timeframe, start, end), || {
                    job.run().boxed()
                })
                .await;
            match outcome {
                Ok(report) => routes.push(report),
                // A failed persist means events were not emitted and the
                // caller must know; surface it.
                Err(e @ CandelaError::Store(_)) => return Err(e),
                Err(e) => {
                    partial = true;
                    if reason.is_none() {
                        reason = Some(e.to_string());
                    }
                }
            }
        }
        Ok((partial, reason, routes))
    }

    /// Push externally sourced bars (with explicit provenance and revisions)
    /// into the cache, returning the corrections the writes produced.
    ///
    /// Bars violating the OHLC invariants are dropped with a warning, not
    /// surfaced as corrections.
    ///
    /// # Errors
    /// - `Symbol` on malformed symbols; `Store` when persisting fails (no
    ///   events are emitted in that case).
    pub async fn upsert(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bars: Vec<CachedBar>,
    ) -> Result<Vec<CorrectionEvent>, CandelaError> {
        let sym = self.normalizer.normalize(symbol)?;
        let key = sym.to_string();

        let mut valid = Vec::with_capacity(bars.len());
        for cached in bars {
            if let Err(e) = cached.bar.validate(timeframe) {
                tracing::warn!(
                    target = "candela::service",
                    event = "corrupt_bar",
                    provider = %cached.provider,
                    symbol = %key,
                    ts = cached.ts(),
                    error = %e,
                    "dropping upserted bar that violates OHLC invariants"
                );
                continue;
            }
            valid.push(cached);
        }

        let events = self.store.put_many(&key, timeframe, valid).await?;
        for event in &events {
            self.bus.publish(Topic::Correction, event);
        }
        Ok(events)
    }

    /// Live quote through the composite, or `None` when no provider knows
    /// the symbol.
    ///
    /// # Errors
    /// - `Symbol` on malformed symbols; provider failures other than
    ///   not-found propagate.
    pub async fn quote(&self, symbol: &str) -> Result<Option<QuoteTick>, CandelaError> {
        let sym = self.normalizer.normalize(symbol)?;
        match self.composite.quote(&sym).await {
            Ok(tick) => Ok(Some(tick)),
            Err(CandelaError::NotFound { .. } | CandelaError::Unsupported { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use candela_core::connector::CandelaConnector;
use candela_core::merge::ProviderRank;
use candela_core::{
    BackoffConfig, Bar, BarRequest, CandelaError, CanonicalSymbol, QuoteTick, Timeframe,
    timeseries,
};

/// Why an adapter did or did not serve a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The adapter served the request.
    Served {
        /// Bars delivered after any aggregation.
        bars: usize,
        /// The finer cadence fetched when the target was not native.
        aggregated_from: Option<Timeframe>,
    },
    /// The adapter neither serves the timeframe natively nor any finer
    /// divisor of it.
    SkippedTimeframe,
    /// The adapter's history does not reach back to the requested start.
    SkippedHistory,
    /// The connector does not expose bar history at all.
    NoBarCapability,
    /// The adapter returned fewer bars than the window calls for; kept as a
    /// fallback result.
    Short {
        /// Bars actually returned.
        returned: usize,
        /// Bars the window calls for.
        requested: usize,
    },
    /// The adapter failed after retries.
    Failed {
        /// Rendered error.
        error: String,
    },
}

/// One adapter's participation in a routed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAttempt {
    /// Adapter name.
    pub provider: String,
    /// What happened.
    pub outcome: RouteOutcome,
}

/// Metadata describing how a request was routed: which adapter served it and
/// which others were tried or rejected, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteReport {
    /// Canonical symbol string.
    pub symbol: String,
    /// Requested cadence.
    pub timeframe: Timeframe,
    /// Inclusive window start, UTC ms.
    pub from: i64,
    /// Inclusive window end, UTC ms.
    pub to: i64,
    /// Every adapter considered, in priority order.
    pub attempts: Vec<RouteAttempt>,
    /// Name of the adapter whose bars were used, if any.
    pub served_by: Option<String>,
}

/// Priority-ordered composition of provider adapters.
///
/// Selection is deterministic given fixed capabilities and priorities:
/// capability filter, history filter, rank, then in-order attempts with
/// chunking and aggregation from the nearest finer supported cadence.
pub(crate) struct Composite {
    connectors: Vec<Arc<dyn CandelaConnector>>,
    rank: Arc<ProviderRank>,
    provider_timeout: Duration,
    backoff: BackoffConfig,
    retry_attempts: u32,
}

impl Composite {
    pub(crate) fn new(
        connectors: Vec<Arc<dyn CandelaConnector>>,
        rank: Arc<ProviderRank>,
        provider_timeout: Duration,
        backoff: BackoffConfig,
        retry_attempts: u32,
    ) -> Self {
        Self {
            connectors,
            rank,
            provider_timeout,
            backoff,
            retry_attempts,
        }
    }

    /// Connectors ordered by the effective priority: configured rank first,
    /// registration order breaking ties.
    fn ranked(&self) -> Vec<Arc<dyn CandelaConnector>> {
        let mut out: Vec<(usize, usize, Arc<dyn CandelaConnector>)> = self
            .connectors
            .iter()
            .cloned()
            .enumerate()
            .map(|(idx, c)| (self.rank.rank(c.name()), idx, c))
            .collect();
        out.sort_by_key(|(rank, idx, _)| (*rank, *idx));
        out.into_iter().map(|(_, _, c)| c).collect()
    }

    fn jittered(&self, base: Duration) -> Duration {
        let jitter = u64::from(self.backoff.jitter_percent.min(100));
        if jitter == 0 {
            return base;
        }
        let ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let spread = ms * jitter / 100;
        let extra = rand::rng().random_range(0..=spread);
        Duration::from_millis(ms + extra)
    }

    /// One provider call with per-attempt timeout and bounded retries on
    /// transient failures.
    async fn call_with_retry<T, F, Fut>(
        &self,
        provider: &'static str,
        capability: &'static str,
        call: F,
    ) -> Result<T, CandelaError>
    where
        F: Fn() -> Fut,
        Fut: core::future::Future<Output = Result<T, CandelaError>> + Send,
    {
        let attempts = self.retry_attempts.max(1);
        let mut last = CandelaError::provider_timeout(provider, capability);
        for attempt in 0..attempts {
            let outcome = tokio::time::timeout(self.provider_timeout, call())
                .await
                .unwrap_or_else(|_| Err(CandelaError::provider_timeout(provider, capability)));
            match outcome {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    let delay = match &e {
                        CandelaError::RateLimited {
                            retry_after: Some(after),
                            ..
                        } => *after,
                        _ => self.backoff.delay_for(attempt),
                    };
                    tracing::debug!(
                        target = "candela::router",
                        event = "retry",
                        provider,
                        capability,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "transient provider failure; backing off"
                    );
                    tokio::time::sleep(self.jittered(delay)).await;
                    last = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last)
    }

    /// Fetch the window from one adapter at `fetch_tf`, chunked to its
    /// per-request limit, concatenated ascending.
    async fn fetch_chunked(
        &self,
        connector: &Arc<dyn CandelaConnector>,
        symbol: &CanonicalSymbol,
        fetch_tf: Timeframe,
        from: i64,
        to: i64,
        max_bars: usize,
    ) -> Result<Vec<Bar>, CandelaError> {
        let provider = connector.name();
        let bar_provider = connector
            .as_bar_provider()
            .ok_or_else(|| CandelaError::unsupported("bars"))?;

        let step = fetch_tf.duration_ms();
        let chunk_span = step.saturating_mul(i64::try_from(max_bars.max(1)).unwrap_or(i64::MAX));

        let mut out: Vec<Bar> = Vec::new();
        let mut start = from;
        while start <= to {
            let end = start.saturating_add(chunk_span - step).min(to);
            let req = BarRequest {
                symbol: symbol.clone(),
                timeframe: fetch_tf,
                from: start,
                to: end,
                limit: Some(max_bars),
            };
            let chunk = self
                .call_with_retry(provider, "bars", || bar_provider.bars(&req))
                .await?;
            out.extend(chunk);
            start = end + step;
        }

        out.sort_by_key(|b| b.ts);
        out.dedup_by_key(|b| b.ts);
        Ok(out)
    }

    /// Route a bar request across the adapters.
    ///
    /// Returns the served bars (possibly fewer than the window calls for,
    /// from the best fallback) and the route report. Errors only when no
    /// adapter produced anything usable.
    pub(crate) async fn fetch_bars(
        &self,
        symbol: &CanonicalSymbol,
        timeframe: Timeframe,
        from: i64,
        to: i64,
    ) -> Result<(Vec<Bar>, RouteReport), CandelaError> {
        let mut report = RouteReport {
            symbol: symbol.to_string(),
            timeframe,
            from,
            to,
            attempts: Vec::new(),
            served_by: None,
        };

        let first_target = timeframe.ceil(from);
        let last_target = timeframe.floor(to);
        if last_target < first_target {
            return Ok((Vec::new(), report));
        }
        let expected = ((last_target - first_target) / timeframe.duration_ms() + 1) as usize;

        let mut best: Option<(Vec<Bar>, String)> = None;
        let mut errors: Vec<CandelaError> = Vec::new();

        for connector in self.ranked() {
            let name = connector.name();
            let caps = connector.capabilities();

            if connector.as_bar_provider().is_none() {
                report.attempts.push(RouteAttempt {
                    provider: name.to_string(),
                    outcome: RouteOutcome::NoBarCapability,
                });
                continue;
            }
            // Capability filter: native support or a finer divisor to
            // aggregate from.
            let plan = if caps.supports(timeframe) {
                Some((timeframe, None))
            } else {
                caps.finest_covering(timeframe)
                    .map(|finer| (finer, Some(timeframe)))
            };
            let Some((fetch_tf, aggregate_to)) = plan else {
                report.attempts.push(RouteAttempt {
                    provider: name.to_string(),
                    outcome: RouteOutcome::SkippedTimeframe,
                });
                continue;
            };
            // History filter.
            if caps
                .earliest_historical_ts
                .is_some_and(|earliest| earliest > from)
            {
                report.attempts.push(RouteAttempt {
                    provider: name.to_string(),
                    outcome: RouteOutcome::SkippedHistory,
                });
                continue;
            }

            // Aggregation needs the source bars that cover the final target
            // bucket in full.
            let (fetch_from, fetch_to) = if aggregate_to.is_some() {
                (
                    first_target,
                    last_target + timeframe.duration_ms() - fetch_tf.duration_ms(),
                )
            } else {
                (first_target, last_target)
            };

            let fetched = self
                .fetch_chunked(
                    &connector,
                    symbol,
                    fetch_tf,
                    fetch_from,
                    fetch_to,
                    caps.max_bars_per_request,
                )
                .await;

            let bars = match fetched {
                Ok(bars) => bars,
                // Includes InsufficientBars: the adapter is exhausted for
                // this window, so move on to the next one.
                Err(e) => {
                    report.attempts.push(RouteAttempt {
                        provider: name.to_string(),
                        outcome: RouteOutcome::Failed {
                            error: e.to_string(),
                        },
                    });
                    errors.push(e);
                    continue;
                }
            };

            let bars = match aggregate_to {
                Some(target) => match timeseries::aggregate(&bars, fetch_tf, target) {
                    Ok(aggregated) => aggregated,
                    Err(e) => {
                        report.attempts.push(RouteAttempt {
                            provider: name.to_string(),
                            outcome: RouteOutcome::Failed {
                                error: e.to_string(),
                            },
                        });
                        errors.push(e);
                        continue;
                    }
                },
                None => bars,
            };
            let bars: Vec<Bar> = bars
                .into_iter()
                .filter(|b| b.ts >= first_target && b.ts <= last_target)
                .collect();

            if bars.len() >= expected {
                report.attempts.push(RouteAttempt {
                    provider: name.to_string(),
                    outcome: RouteOutcome::Served {
                        bars: bars.len(),
                        aggregated_from: aggregate_to.map(|_| fetch_tf),
                    },
                });
                report.served_by = Some(name.to_string());
                return Ok((bars, report));
            }

            report.attempts.push(RouteAttempt {
                provider: name.to_string(),
                outcome: RouteOutcome::Short {
                    returned: bars.len(),
                    requested: expected,
                },
            });
            if !bars.is_empty()
                && best.as_ref().is_none_or(|(b, _)| bars.len() > b.len())
            {
                best = Some((bars, name.to_string()));
            }
        }

        if let Some((bars, name)) = best {
            report.served_by = Some(name);
            return Ok((bars, report));
        }
        if report.attempts.is_empty() || errors.is_empty() {
            return Err(CandelaError::not_found(format!(
                "bars for {symbol} at {timeframe}"
            )));
        }
        Err(CandelaError::AllProvidersFailed(errors))
    }

    /// Priority-with-fallback quote fetch across quote-capable adapters.
    pub(crate) async fn quote(
        &self,
        symbol: &CanonicalSymbol,
    ) -> Result<QuoteTick, CandelaError> {
        let mut attempted = false;
        let mut errors: Vec<CandelaError> = Vec::new();

        for connector in self.ranked() {
            let Some(provider) = connector.as_quote_provider() else {
                continue;
            };
            attempted = true;
            let name = connector.name();
            let outcome = tokio::time::timeout(self.provider_timeout, provider.quote(symbol))
                .await
                .unwrap_or_else(|_| Err(CandelaError::provider_timeout(name, "quote")));
            match outcome {
                Ok(tick) => return Ok(tick),
                Err(e) => errors.push(e),
            }
        }

        if !attempted {
            return Err(CandelaError::unsupported("quote"));
        }
        if errors
            .iter()
            .all(|e| matches!(e, CandelaError::NotFound { .. }))
        {
            return Err(CandelaError::not_found(format!("quote for {symbol}")));
        }
        Err(CandelaError::AllProvidersFailed(errors))
    }
}

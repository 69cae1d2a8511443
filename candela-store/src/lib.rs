//! candela-store
//!
//! Two-tier bar storage: a size-bounded in-memory hot tier over a durable
//! sqlite cold tier. The cold tier keeps one row per
//! `(symbol, timeframe, timestamp, provider)` holding that provider's latest
//! revision; winner selection across providers delegates to the merge engine
//! so reads always observe the same bar the merge rules would pick.
#![warn(missing_docs)]

mod hot;
mod migrations;
mod sqlite;

pub use hot::{HotKey, HotTier};
pub use sqlite::SqliteStore;

use std::sync::Arc;

use candela_core::merge::{MergeDecision, ProviderRank, merge};
use candela_core::{Bar, CachedBar, CandelaError, CorrectionEvent, Timeframe};

/// Narrow interface to the persistent tier.
///
/// Implementations serialize writes internally; `put_many` is atomic (all
/// rows and correction records land in one transaction or none do).
pub trait ColdStore: Send + Sync {
    /// Every provider's latest-revision row at one timestamp.
    fn rows_at(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        ts: i64,
    ) -> Result<Vec<CachedBar>, CandelaError>;

    /// Every provider row in the inclusive window, ascending by timestamp.
    fn rows_in(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: i64,
        to: i64,
    ) -> Result<Vec<CachedBar>, CandelaError>;

    /// Persist bars, delegating winner selection to the merge engine, and
    /// return the correction events the writes produced.
    fn put_many(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bars: &[CachedBar],
        rank: &ProviderRank,
    ) -> Result<Vec<CorrectionEvent>, CandelaError>;

    /// Persist provider-fetched bars that carry no revision numbers.
    ///
    /// The revision for each bar is assigned by content comparison against
    /// the provider's stored row: unchanged content refreshes `fetched_at`
    /// only, changed content bumps the revision.
    fn ingest(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        provider: &str,
        bars: &[Bar],
        fetched_at: i64,
        rank: &ProviderRank,
    ) -> Result<Vec<CorrectionEvent>, CandelaError>;

    /// The most recent stored timestamp for a key, if any.
    fn latest_ts(&self, symbol: &str, timeframe: Timeframe) -> Result<Option<i64>, CandelaError>;

    /// Recorded corrections for the window, ascending.
    fn corrections_in(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: i64,
        to: i64,
    ) -> Result<Vec<CorrectionEvent>, CandelaError>;
}

/// Fold provider rows for one timestamp down to the winning bar.
pub fn winner_of<'a, I>(rows: I, rank: &ProviderRank) -> Option<CachedBar>
where
    I: IntoIterator<Item = &'a CachedBar>,
{
    let mut winner: Option<CachedBar> = None;
    for row in rows {
        if let MergeDecision::TakeIncoming(_) = merge(winner.as_ref(), row, rank) {
            winner = Some(row.clone());
        }
    }
    winner
}

/// The two-tier store: hot reads with lazy cold fallback, write-through puts.
///
/// Writes persist to the cold tier before returning and update the hot tier
/// on the same path; the hot tier only ever holds winning bars, so a hot hit
/// is always the bar a cold read would merge to.
pub struct TieredStore {
    hot: HotTier,
    cold: Arc<dyn ColdStore>,
    rank: ProviderRank,
    // Serializes mutations and cold-read repopulation so the hot tier cannot
    // capture a winner that a concurrent write already displaced.
    gate: tokio::sync::Mutex<()>,
}

impl TieredStore {
    /// Build over an opened cold store.
    #[must_use]
    pub fn new(cold: Arc<dyn ColdStore>, rank: ProviderRank, hot_capacity: u64) -> Self {
        Self {
            hot: HotTier::new(hot_capacity),
            cold,
            rank,
            gate: tokio::sync::Mutex::new(()),
        }
    }

    /// The priority order used for winner selection.
    #[must_use]
    pub fn rank(&self) -> &ProviderRank {
        &self.rank
    }

    /// Direct access to the cold tier (verification tooling).
    #[must_use]
    pub fn cold(&self) -> &Arc<dyn ColdStore> {
        &self.cold
    }

    /// Number of entries resident in the hot tier.
    #[must_use]
    pub fn hot_entry_count(&self) -> u64 {
        self.hot.entry_count()
    }

    fn hot_key(&self, symbol: &str, timeframe: Timeframe, ts: i64, provider: &str) -> HotKey {
        HotKey {
            symbol: symbol.to_string(),
            timeframe,
            ts,
            provider: provider.to_string(),
        }
    }

    fn probe_hot(&self, symbol: &str, timeframe: Timeframe, ts: i64) -> Option<CachedBar> {
        for provider in self.rank.order() {
            let key = self.hot_key(symbol, timeframe, ts, provider);
            if let Some(bar) = self.hot.get(&key) {
                return Some(bar);
            }
        }
        None
    }

    fn apply_events_to_hot(&self, symbol: &str, timeframe: Timeframe, events: &[CorrectionEvent]) {
        for event in events {
            if let Some(old) = &event.old
                && old.provider != event.new.provider
            {
                self.hot
                    .invalidate(&self.hot_key(symbol, timeframe, event.ts, &old.provider));
            }
            let key = self.hot_key(symbol, timeframe, event.ts, &event.new.provider);
            self.hot.insert(key, event.new.clone());
        }
    }

    /// The winning bar for one timestamp, if any.
    ///
    /// # Errors
    /// `Store` when the cold tier fails.
    pub async fn get(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        ts: i64,
    ) -> Result<Option<CachedBar>, CandelaError> {
        if let Some(hit) = self.probe_hot(symbol, timeframe, ts) {
            return Ok(Some(hit));
        }
        let _guard = self.gate.lock().await;
        let rows = self.cold.rows_at(symbol, timeframe, ts)?;
        let winner = winner_of(rows.iter(), &self.rank);
        if let Some(w) = &winner {
            let key = self.hot_key(symbol, timeframe, ts, &w.provider);
            self.hot.insert(key, w.clone());
        }
        Ok(winner)
    }

    /// Winning bars in the inclusive window, ascending, one per timestamp.
    ///
    /// Served from the hot tier when every grid timestamp is resident;
    /// otherwise one cold range scan refills the hot tier.
    ///
    /// # Errors
    /// `InvalidArg` on a reversed window; `Store` when the cold tier fails.
    pub async fn get_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: i64,
        to: i64,
    ) -> Result<Vec<CachedBar>, CandelaError> {
        if from > to {
            return Err(CandelaError::InvalidArg(format!(
                "reversed range: {from} > {to}"
            )));
        }

        let step = timeframe.duration_ms();
        let first = timeframe.ceil(from);
        let mut hot_hits = Vec::new();
        let mut complete = true;
        let mut ts = first;
        while ts <= to {
            match self.probe_hot(symbol, timeframe, ts) {
                Some(bar) => hot_hits.push(bar),
                None => {
                    complete = false;
                    break;
                }
            }
            ts += step;
        }
        if complete {
            return Ok(hot_hits);
        }

        let _guard = self.gate.lock().await;
        let rows = self.cold.rows_in(symbol, timeframe, from, to)?;
        let mut out: Vec<CachedBar> = Vec::new();
        let mut idx = 0;
        while idx < rows.len() {
            let ts = rows[idx].ts();
            let mut end = idx;
            while end < rows.len() && rows[end].ts() == ts {
                end += 1;
            }
            if let Some(winner) = winner_of(rows[idx..end].iter(), &self.rank) {
                let key = self.hot_key(symbol, timeframe, ts, &winner.provider);
                self.hot.insert(key, winner.clone());
                out.push(winner);
            }
            idx = end;
        }
        Ok(out)
    }

    /// Best-effort range read from the hot tier alone, holes allowed.
    ///
    /// Used when the cold tier is unreachable: whatever winners are resident
    /// in memory come back, nothing else.
    #[must_use]
    pub fn hot_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: i64,
        to: i64,
    ) -> Vec<CachedBar> {
        let step = timeframe.duration_ms();
        let mut out = Vec::new();
        let mut ts = timeframe.ceil(from);
        while ts <= to {
            if let Some(bar) = self.probe_hot(symbol, timeframe, ts) {
                out.push(bar);
            }
            ts += step;
        }
        out
    }

    /// Persist one bar; returns the correction event when the write changed
    /// the winning bar for its timestamp.
    ///
    /// # Errors
    /// `Store` when the cold tier fails; nothing is persisted in that case.
    pub async fn put(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bar: CachedBar,
    ) -> Result<Option<CorrectionEvent>, CandelaError> {
        let mut events = self.put_many(symbol, timeframe, vec![bar]).await?;
        Ok(events.pop())
    }

    /// Persist a batch atomically at the cold tier and update the hot tier on
    /// the same path. Idempotent: re-inserting stored bars is a no-op.
    ///
    /// # Errors
    /// `Store` when the cold tier fails; no events are produced for writes
    /// that did not persist.
    pub async fn put_many(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bars: Vec<CachedBar>,
    ) -> Result<Vec<CorrectionEvent>, CandelaError> {
        let _guard = self.gate.lock().await;
        let events = self.cold.put_many(symbol, timeframe, &bars, &self.rank)?;
        self.apply_events_to_hot(symbol, timeframe, &events);
        Ok(events)
    }

    /// Persist provider-fetched bars, assigning revisions by content
    /// comparison (see [`ColdStore::ingest`]).
    ///
    /// # Errors
    /// `Store` when the cold tier fails; no events are produced for writes
    /// that did not persist.
    pub async fn ingest(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        provider: &str,
        bars: Vec<Bar>,
        fetched_at: i64,
    ) -> Result<Vec<CorrectionEvent>, CandelaError> {
        let _guard = self.gate.lock().await;
        let events = self
            .cold
            .ingest(symbol, timeframe, provider, &bars, fetched_at, &self.rank)?;
        // Confirmed-unchanged rows refreshed fetched_at without an event;
        // drop their hot entries so reads pick up the new observation time.
        for bar in &bars {
            self.hot
                .invalidate(&self.hot_key(symbol, timeframe, bar.ts, provider));
        }
        self.apply_events_to_hot(symbol, timeframe, &events);
        Ok(events)
    }
}

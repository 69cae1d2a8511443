use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, Row, params};

use candela_core::merge::{MergeDecision, ProviderRank, merge};
use candela_core::{
    Bar, CachedBar, CandelaError, CorrectionEvent, CorrectionKind, Timeframe, now_ms,
};

use crate::migrations;
use crate::winner_of;

fn store_err(e: rusqlite::Error) -> CandelaError {
    CandelaError::store(e.to_string())
}

fn decimal(text: &str, column: &str) -> Result<rust_decimal::Decimal, CandelaError> {
    text.parse()
        .map_err(|_| CandelaError::Data(format!("unparseable {column} price: {text:?}")))
}

/// Durable cold tier backed by sqlite.
///
/// One row per `(symbol, timeframe, timestamp, provider)` holding that
/// provider's latest revision; winner selection across providers happens at
/// read time. All access serializes on the connection lock, which also gives
/// writes to the same key a total order.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store from a connection string.
    ///
    /// Accepted forms: `sqlite:<path>` and `sqlite::memory:`.
    ///
    /// # Errors
    /// `InvalidArg` for unrecognized schemes (including `postgres://`, which
    /// this build does not ship a backend for); `Store` when sqlite cannot
    /// open the file or run migrations.
    pub fn open(url: &str) -> Result<Self, CandelaError> {
        if let Some(rest) = url.strip_prefix("sqlite:") {
            if rest == ":memory:" {
                return Self::in_memory();
            }
            return Self::at_path(rest);
        }
        Err(CandelaError::InvalidArg(format!(
            "unsupported cold store url {url:?}; expected sqlite:<path> or sqlite::memory:"
        )))
    }

    /// Open (or create) a file-backed store.
    ///
    /// # Errors
    /// `Store` when sqlite cannot open the file or run migrations.
    pub fn at_path(path: impl AsRef<Path>) -> Result<Self, CandelaError> {
        let conn = Connection::open(path).map_err(store_err)?;
        Self::from_connection(conn)
    }

    /// An in-memory store; data is lost on drop. Useful for tests.
    ///
    /// # Errors
    /// `Store` when migrations fail.
    pub fn in_memory() -> Result<Self, CandelaError> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, CandelaError> {
        migrations::apply(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CandelaError> {
        self.conn
            .lock()
            .map_err(|e| CandelaError::store(e.to_string()))
    }

    fn rows_where(
        &self,
        where_clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<CachedBar>, CandelaError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT timestamp, provider, revision,
                    open, high, low, close, volume, fetched_at
             FROM bars WHERE {where_clause}
             ORDER BY timestamp ASC, provider ASC"
        );
        let mut stmt = conn.prepare(&sql).map_err(store_err)?;
        let mapped = stmt.query_map(params, bar_row).map_err(store_err)?;

        let mut out = Vec::new();
        for item in mapped {
            out.push(item.map_err(store_err)?);
        }
        Ok(out)
    }
}

fn row_decimal(row: &Row<'_>, idx: usize) -> rusqlite::Result<rust_decimal::Decimal> {
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

fn bar_row(row: &Row<'_>) -> rusqlite::Result<CachedBar> {
    Ok(CachedBar {
        bar: Bar {
            ts: row.get(0)?,
            open: row_decimal(row, 3)?,
            high: row_decimal(row, 4)?,
            low: row_decimal(row, 5)?,
            close: row_decimal(row, 6)?,
            volume: u64::try_from(row.get::<_, i64>(7)?).unwrap_or(0),
        },
        provider: row.get(1)?,
        revision: u32::try_from(row.get::<_, i64>(2)?).unwrap_or(0),
        fetched_at: row.get(8)?,
    })
}

impl crate::ColdStore for SqliteStore {
    fn rows_at(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        ts: i64,
    ) -> Result<Vec<CachedBar>, CandelaError> {
        self.rows_where(
            "symbol = ?1 AND timeframe = ?2 AND timestamp = ?3",
            &[&symbol, &timeframe.as_str(), &ts],
        )
    }

    fn rows_in(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: i64,
        to: i64,
    ) -> Result<Vec<CachedBar>, CandelaError> {
        self.rows_where(
            "symbol = ?1 AND timeframe = ?2 AND timestamp >= ?3 AND timestamp <= ?4",
            &[&symbol, &timeframe.as_str(), &from, &to],
        )
    }

    fn put_many(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bars: &[CachedBar],
        rank: &ProviderRank,
    ) -> Result<Vec<CorrectionEvent>, CandelaError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(store_err)?;
        let mut events = Vec::new();

        for incoming in bars {
            if let Some(event) = apply_incoming(&tx, symbol, timeframe, incoming, rank)? {
                events.push(event);
            }
        }

        tx.commit().map_err(store_err)?;
        Ok(events)
    }

    fn ingest(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        provider: &str,
        bars: &[Bar],
        fetched_at: i64,
        rank: &ProviderRank,
    ) -> Result<Vec<CorrectionEvent>, CandelaError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(store_err)?;
        let mut events = Vec::new();

        for bar in bars {
            let existing = read_rows_at(&tx, symbol, timeframe, bar.ts)?;
            let same = existing.iter().find(|r| r.provider == provider);
            // Adapters carry no revision numbers on the wire; the cache
            // assigns them by content comparison against the provider's own
            // stored row.
            let revision = match same {
                Some(row) if row.bar == *bar => {
                    // Unchanged content confirms the bar: refresh its
                    // observation time, emit nothing.
                    tx.execute(
                        "UPDATE bars SET fetched_at = ?1
                         WHERE symbol = ?2 AND timeframe = ?3
                           AND timestamp = ?4 AND provider = ?5",
                        params![fetched_at, symbol, timeframe.as_str(), bar.ts, provider],
                    )
                    .map_err(store_err)?;
                    continue;
                }
                Some(row) => row.revision + 1,
                None => 1,
            };
            let incoming = CachedBar {
                bar: bar.clone(),
                provider: provider.to_string(),
                revision,
                fetched_at,
            };
            if let Some(event) = apply_incoming(&tx, symbol, timeframe, &incoming, rank)? {
                events.push(event);
            }
        }

        tx.commit().map_err(store_err)?;
        Ok(events)
    }

    fn latest_ts(&self, symbol: &str, timeframe: Timeframe) -> Result<Option<i64>, CandelaError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT MAX(timestamp) FROM bars WHERE symbol = ?1 AND timeframe = ?2",
            params![symbol, timeframe.as_str()],
            |row| row.get::<_, Option<i64>>(0),
        )
        .optional()
        .map(Option::flatten)
        .map_err(store_err)
    }

    fn corrections_in(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: i64,
        to: i64,
    ) -> Result<Vec<CorrectionEvent>, CandelaError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT timestamp, kind,
                        old_provider, old_revision, old_open, old_high, old_low, old_close,
                        old_volume, old_fetched_at,
                        new_provider, new_revision, new_open, new_high, new_low, new_close,
                        new_volume, new_fetched_at,
                        detected_at
                 FROM corrections
                 WHERE symbol = ?1 AND timeframe = ?2
                   AND timestamp >= ?3 AND timestamp <= ?4
                 ORDER BY timestamp ASC, id ASC",
            )
            .map_err(store_err)?;

        let mapped = stmt
            .query_map(
                params![symbol, timeframe.as_str(), from, to],
                correction_row,
            )
            .map_err(store_err)?;

        let mut out = Vec::new();
        for item in mapped {
            let raw = item.map_err(store_err)?;
            out.push(raw.into_event(symbol, timeframe)?);
        }
        Ok(out)
    }
}

// Shared write path: revision guard, row upsert, winner re-selection, and
// correction recording, all inside the caller's transaction.
fn apply_incoming(
    tx: &rusqlite::Transaction<'_>,
    symbol: &str,
    timeframe: Timeframe,
    incoming: &CachedBar,
    rank: &ProviderRank,
) -> Result<Option<CorrectionEvent>, CandelaError> {
    let existing = read_rows_at(tx, symbol, timeframe, incoming.ts())?;
    let same_provider = existing
        .iter()
        .find(|r| r.provider == incoming.provider)
        .map(|r| r.revision);
    // Revision monotonicity: never replace a row with an older or equal
    // revision from the same provider.
    if same_provider.is_some_and(|rev| rev >= incoming.revision) {
        return Ok(None);
    }

    let winner_before = winner_of(existing.iter(), rank);
    tx.execute(
        "INSERT OR REPLACE INTO bars
         (symbol, timeframe, timestamp, provider, revision,
          open, high, low, close, volume, fetched_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            symbol,
            timeframe.as_str(),
            incoming.ts(),
            incoming.provider,
            i64::from(incoming.revision),
            incoming.bar.open.to_string(),
            incoming.bar.high.to_string(),
            incoming.bar.low.to_string(),
            incoming.bar.close.to_string(),
            i64::try_from(incoming.bar.volume).unwrap_or(i64::MAX),
            incoming.fetched_at,
        ],
    )
    .map_err(store_err)?;

    if let MergeDecision::TakeIncoming(kind) = merge(winner_before.as_ref(), incoming, rank) {
        let event = CorrectionEvent {
            symbol: symbol.to_string(),
            timeframe,
            ts: incoming.ts(),
            old: winner_before,
            new: incoming.clone(),
            kind,
            detected_at: now_ms(),
        };
        record_correction(tx, &event)?;
        return Ok(Some(event));
    }
    Ok(None)
}

fn read_rows_at(
    tx: &rusqlite::Transaction<'_>,
    symbol: &str,
    timeframe: Timeframe,
    ts: i64,
) -> Result<Vec<CachedBar>, CandelaError> {
    let mut stmt = tx
        .prepare_cached(
            "SELECT timestamp, provider, revision, open, high, low, close, volume, fetched_at
             FROM bars
             WHERE symbol = ?1 AND timeframe = ?2 AND timestamp = ?3
             ORDER BY provider ASC",
        )
        .map_err(store_err)?;
    let mapped = stmt
        .query_map(params![symbol, timeframe.as_str(), ts], bar_row)
        .map_err(store_err)?;

    let mut out = Vec::new();
    for item in mapped {
        out.push(item.map_err(store_err)?);
    }
    Ok(out)
}

fn record_correction(
    tx: &rusqlite::Transaction<'_>,
    event: &CorrectionEvent,
) -> Result<(), CandelaError> {
    tx.execute(
        "INSERT INTO corrections
         (symbol, timeframe, timestamp, kind,
          old_provider, old_revision, old_open, old_high, old_low, old_close,
          old_volume, old_fetched_at,
          new_provider, new_revision, new_open, new_high, new_low, new_close,
          new_volume, new_fetched_at,
          detected_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                 ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
        params![
            event.symbol,
            event.timeframe.as_str(),
            event.ts,
            event.kind.as_str(),
            event.old.as_ref().map(|o| o.provider.clone()),
            event.old.as_ref().map(|o| i64::from(o.revision)),
            event.old.as_ref().map(|o| o.bar.open.to_string()),
            event.old.as_ref().map(|o| o.bar.high.to_string()),
            event.old.as_ref().map(|o| o.bar.low.to_string()),
            event.old.as_ref().map(|o| o.bar.close.to_string()),
            event
                .old
                .as_ref()
                .map(|o| i64::try_from(o.bar.volume).unwrap_or(i64::MAX)),
            event.old.as_ref().map(|o| o.fetched_at),
            event.new.provider,
            i64::from(event.new.revision),
            event.new.bar.open.to_string(),
            event.new.bar.high.to_string(),
            event.new.bar.low.to_string(),
            event.new.bar.close.to_string(),
            i64::try_from(event.new.bar.volume).unwrap_or(i64::MAX),
            event.new.fetched_at,
            event.detected_at,
        ],
    )
    .map_err(store_err)?;
    Ok(())
}

struct CorrectionRow {
    ts: i64,
    kind: String,
    old: Option<(String, i64, String, String, String, String, i64, i64)>,
    new: (String, i64, String, String, String, String, i64, i64),
    detected_at: i64,
}

impl CorrectionRow {
    fn into_event(
        self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<CorrectionEvent, CandelaError> {
        let kind = match self.kind.as_str() {
            "initial" => CorrectionKind::Initial,
            "revision" => CorrectionKind::Revision,
            "provider_override" => CorrectionKind::ProviderOverride,
            other => {
                return Err(CandelaError::Data(format!(
                    "unknown correction kind {other:?} in audit table"
                )));
            }
        };
        let to_bar = |ts: i64,
                      (provider, revision, open, high, low, close, volume, fetched_at): (
            String,
            i64,
            String,
            String,
            String,
            String,
            i64,
            i64,
        )|
         -> Result<CachedBar, CandelaError> {
            Ok(CachedBar {
                bar: Bar {
                    ts,
                    open: decimal(&open, "open")?,
                    high: decimal(&high, "high")?,
                    low: decimal(&low, "low")?,
                    close: decimal(&close, "close")?,
                    volume: u64::try_from(volume).unwrap_or(0),
                },
                provider,
                revision: u32::try_from(revision).unwrap_or(0),
                fetched_at,
            })
        };
        Ok(CorrectionEvent {
            symbol: symbol.to_string(),
            timeframe,
            ts: self.ts,
            old: self.old.map(|o| to_bar(self.ts, o)).transpose()?,
            new: to_bar(self.ts, self.new)?,
            kind,
            detected_at: self.detected_at,
        })
    }
}

fn correction_row(row: &Row<'_>) -> rusqlite::Result<CorrectionRow> {
    let old_provider: Option<String> = row.get(2)?;
    let old = if let Some(provider) = old_provider {
        Some((
            provider,
            row.get::<_, i64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, i64>(8)?,
            row.get::<_, i64>(9)?,
        ))
    } else {
        None
    };
    Ok(CorrectionRow {
        ts: row.get(0)?,
        kind: row.get(1)?,
        old,
        new: (
            row.get::<_, String>(10)?,
            row.get::<_, i64>(11)?,
            row.get::<_, String>(12)?,
            row.get::<_, String>(13)?,
            row.get::<_, String>(14)?,
            row.get::<_, String>(15)?,
            row.get::<_, i64>(16)?,
            row.get::<_, i64>(17)?,
        ),
        detected_at: row.get(18)?,
    })
}

use rusqlite::Connection;

use candela_core::CandelaError;

// Forward-only, numbered migrations. Never edit a shipped file; add a new one.
const MIGRATIONS: &[(i64, &str, &str)] = &[
    (1, "0001_bars", include_str!("../migrations/0001_bars.sql")),
    (
        2,
        "0002_corrections",
        include_str!("../migrations/0002_corrections.sql"),
    ),
];

fn store_err(e: rusqlite::Error) -> CandelaError {
    CandelaError::store(e.to_string())
}

/// Apply every pending migration under a transaction, tracking progress in
/// `_migrations`.
pub fn apply(conn: &mut Connection) -> Result<(), CandelaError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version    INTEGER PRIMARY KEY,
            name       TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )
    .map_err(store_err)?;

    for &(version, name, sql) in MIGRATIONS {
        let applied: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM _migrations WHERE version = ?1",
                [version],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n > 0)
            .map_err(store_err)?;
        if applied {
            continue;
        }

        let tx = conn.transaction().map_err(store_err)?;
        tx.execute_batch(sql).map_err(store_err)?;
        tx.execute(
            "INSERT INTO _migrations (version, name, applied_at) VALUES (?1, ?2, datetime('now'))",
            rusqlite::params![version, name],
        )
        .map_err(store_err)?;
        tx.commit().map_err(store_err)?;
        tracing::debug!(
            target = "candela::store",
            event = "migration_applied",
            version,
            name,
            "applied cold-store migration"
        );
    }
    Ok(())
}

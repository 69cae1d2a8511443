use std::sync::Arc;

use candela_core::merge::ProviderRank;
use candela_core::{Bar, CachedBar, Timeframe};
use candela_store::{SqliteStore, TieredStore};
use rust_decimal::Decimal;

const H1: i64 = 3_600_000;
const BASE: i64 = 1_700_000_000_000 - 1_700_000_000_000 % H1;

fn cached(ts: i64, close_cents: i64) -> CachedBar {
    CachedBar {
        bar: Bar {
            ts,
            open: Decimal::new(20_000, 2),
            high: Decimal::new(20_100, 2),
            low: Decimal::new(19_900, 2),
            close: Decimal::new(close_cents, 2),
            volume: 42,
        },
        provider: "polygon".to_string(),
        revision: 1,
        fetched_at: ts,
    }
}

#[tokio::test]
async fn cold_tier_survives_restart_and_hot_tier_rebuilds_lazily() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bars.db");
    let url = format!("sqlite:{}", path.display());

    {
        let cold = Arc::new(SqliteStore::open(&url).unwrap());
        let store = TieredStore::new(cold, ProviderRank::new(["polygon"]), 100);
        store
            .put_many(
                "NQ",
                Timeframe::H1,
                (0..3).map(|i| cached(BASE + i * H1, 20_000 + i)).collect(),
            )
            .await
            .unwrap();
    }

    // A fresh process: cold data is there, hot tier starts empty.
    let cold = Arc::new(SqliteStore::open(&url).unwrap());
    let store = TieredStore::new(cold, ProviderRank::new(["polygon"]), 100);
    assert_eq!(store.hot_entry_count(), 0);

    let got = store
        .get_range("NQ", Timeframe::H1, BASE, BASE + 2 * H1)
        .await
        .unwrap();
    assert_eq!(got.len(), 3);
    assert_eq!(got[2].bar.close, Decimal::new(20_002, 2));

    // The miss refilled the hot tier.
    assert!(store.hot_entry_count() >= 3);
}

#[tokio::test]
async fn reopening_applies_migrations_idempotently() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bars.db");
    let url = format!("sqlite:{}", path.display());
    for _ in 0..3 {
        let _ = SqliteStore::open(&url).unwrap();
    }
}

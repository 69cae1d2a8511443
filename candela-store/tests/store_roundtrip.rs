use std::sync::Arc;

use candela_core::merge::ProviderRank;
use candela_core::{Bar, CachedBar, CorrectionKind, Timeframe};
use candela_store::{SqliteStore, TieredStore};
use rust_decimal::Decimal;

const M5: i64 = 5 * 60_000;
const BASE: i64 = 1_700_000_000_000 - 1_700_000_000_000 % M5;

fn cached(ts: i64, provider: &str, revision: u32, close_cents: i64) -> CachedBar {
    CachedBar {
        bar: Bar {
            ts,
            open: Decimal::new(10_000, 2),
            high: Decimal::new(10_100, 2),
            low: Decimal::new(9_900, 2),
            close: Decimal::new(close_cents, 2),
            volume: 10_000,
        },
        provider: provider.to_string(),
        revision,
        fetched_at: ts + 1_000,
    }
}

fn store() -> TieredStore {
    let cold = Arc::new(SqliteStore::in_memory().unwrap());
    TieredStore::new(cold, ProviderRank::new(["polygon", "yahoo"]), 1_000)
}

#[tokio::test]
async fn initial_insert_round_trips() {
    let store = store();
    let bar = cached(BASE, "polygon", 1, 10_050);

    let event = store.put("AAPL", Timeframe::M5, bar.clone()).await.unwrap();
    let event = event.expect("initial insert emits an event");
    assert_eq!(event.kind, CorrectionKind::Initial);
    assert!(event.old.is_none());
    assert_eq!(event.new, bar);

    let got = store.get("AAPL", Timeframe::M5, BASE).await.unwrap();
    assert_eq!(got, Some(bar));
}

#[tokio::test]
async fn get_range_returns_one_winner_per_timestamp_ascending() {
    let store = store();
    let bars: Vec<CachedBar> = (0..4)
        .map(|i| cached(BASE + i * M5, "yahoo", 1, 10_000 + i))
        .collect();
    store
        .put_many("AAPL", Timeframe::M5, bars.clone())
        .await
        .unwrap();
    // A higher-priority provider also covers one of the timestamps.
    store
        .put("AAPL", Timeframe::M5, cached(BASE + M5, "polygon", 1, 11_111))
        .await
        .unwrap();

    let got = store
        .get_range("AAPL", Timeframe::M5, BASE, BASE + 3 * M5)
        .await
        .unwrap();
    assert_eq!(got.len(), 4);
    for pair in got.windows(2) {
        assert!(pair[0].ts() < pair[1].ts());
    }
    assert_eq!(got[1].provider, "polygon");
    assert_eq!(got[1].bar.close, Decimal::new(11_111, 2));
    assert_eq!(got[0].provider, "yahoo");
}

#[tokio::test]
async fn put_is_idempotent() {
    let store = store();
    let bar = cached(BASE, "polygon", 1, 10_050);
    let first = store.put("AAPL", Timeframe::M5, bar.clone()).await.unwrap();
    assert!(first.is_some());
    let second = store.put("AAPL", Timeframe::M5, bar.clone()).await.unwrap();
    assert!(second.is_none());
    let got = store.get("AAPL", Timeframe::M5, BASE).await.unwrap();
    assert_eq!(got, Some(bar));
}

#[tokio::test]
async fn keys_are_scoped_by_symbol_and_timeframe() {
    let store = store();
    store
        .put("AAPL", Timeframe::M5, cached(BASE, "polygon", 1, 1))
        .await
        .unwrap();
    assert!(store.get("MSFT", Timeframe::M5, BASE).await.unwrap().is_none());
    assert!(store.get("AAPL", Timeframe::M1, BASE).await.unwrap().is_none());
}

#[tokio::test]
async fn unsupported_store_urls_are_rejected() {
    let err = SqliteStore::open("postgres://localhost/bars").unwrap_err();
    assert!(matches!(err, candela_core::CandelaError::InvalidArg(_)));
    assert!(SqliteStore::open("sqlite::memory:").is_ok());
}

use std::sync::Arc;

use candela_core::merge::ProviderRank;
use candela_core::{Bar, CachedBar, CorrectionKind, Timeframe};
use candela_store::{ColdStore, SqliteStore, TieredStore};
use rust_decimal::Decimal;

const M1: i64 = 60_000;
const T: i64 = 1_700_000_040_000 - 1_700_000_040_000 % M1;

fn cached(provider: &str, revision: u32, close_cents: i64) -> CachedBar {
    CachedBar {
        bar: Bar {
            ts: T,
            open: Decimal::new(450_000, 2),
            high: Decimal::new(450_200, 2),
            low: Decimal::new(449_800, 2),
            close: Decimal::new(close_cents, 2),
            volume: 500,
        },
        provider: provider.to_string(),
        revision,
        fetched_at: T + 500,
    }
}

fn store() -> (TieredStore, Arc<SqliteStore>) {
    let cold = Arc::new(SqliteStore::in_memory().unwrap());
    (
        TieredStore::new(cold.clone(), ProviderRank::new(["polygon", "yahoo"]), 100),
        cold,
    )
}

#[tokio::test]
async fn same_provider_revision_supersedes() {
    let (store, _) = store();
    store.put("ES", Timeframe::M1, cached("polygon", 1, 450_050)).await.unwrap();
    let event = store
        .put("ES", Timeframe::M1, cached("polygon", 2, 450_080))
        .await
        .unwrap()
        .expect("revision bump emits an event");
    assert_eq!(event.kind, CorrectionKind::Revision);
    assert_eq!(event.old.unwrap().bar.close, Decimal::new(450_050, 2));
    assert_eq!(event.new.bar.close, Decimal::new(450_080, 2));

    let got = store.get("ES", Timeframe::M1, T).await.unwrap().unwrap();
    assert_eq!(got.revision, 2);
}

#[tokio::test]
async fn stale_revision_never_replaces_a_newer_one() {
    let (store, cold) = store();
    store.put("ES", Timeframe::M1, cached("polygon", 2, 450_080)).await.unwrap();
    let event = store
        .put("ES", Timeframe::M1, cached("polygon", 1, 450_050))
        .await
        .unwrap();
    assert!(event.is_none());

    let got = store.get("ES", Timeframe::M1, T).await.unwrap().unwrap();
    assert_eq!(got.revision, 2);
    assert_eq!(got.bar.close, Decimal::new(450_080, 2));
    // The stored row itself was not downgraded either.
    let rows = cold.rows_at("ES", Timeframe::M1, T).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].revision, 2);
}

#[tokio::test]
async fn provider_override_and_its_limits() {
    let (store, cold) = store();
    store.put("ES", Timeframe::M1, cached("yahoo", 3, 450_000)).await.unwrap();

    let event = store
        .put("ES", Timeframe::M1, cached("polygon", 1, 450_100))
        .await
        .unwrap()
        .expect("higher-priority provider overrides");
    assert_eq!(event.kind, CorrectionKind::ProviderOverride);
    assert_eq!(event.old.unwrap().provider, "yahoo");

    // The lower-priority provider keeps its provenance row but cannot win.
    let event = store
        .put("ES", Timeframe::M1, cached("yahoo", 9, 449_900))
        .await
        .unwrap();
    assert!(event.is_none());
    let got = store.get("ES", Timeframe::M1, T).await.unwrap().unwrap();
    assert_eq!(got.provider, "polygon");
    assert_eq!(got.bar.close, Decimal::new(450_100, 2));

    let rows = cold.rows_at("ES", Timeframe::M1, T).unwrap();
    assert_eq!(rows.len(), 2);
    let yahoo = rows.iter().find(|r| r.provider == "yahoo").unwrap();
    assert_eq!(yahoo.revision, 9);
}

#[tokio::test]
async fn corrections_are_recorded_in_the_audit_table() {
    let (store, cold) = store();
    store.put("ES", Timeframe::M1, cached("polygon", 1, 450_050)).await.unwrap();
    store.put("ES", Timeframe::M1, cached("polygon", 2, 450_080)).await.unwrap();

    let audit = cold.corrections_in("ES", Timeframe::M1, T, T).unwrap();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0].kind, CorrectionKind::Initial);
    assert_eq!(audit[1].kind, CorrectionKind::Revision);
    assert_eq!(
        audit[1].old.as_ref().unwrap().bar.close,
        Decimal::new(450_050, 2)
    );
}

#[tokio::test]
async fn batched_puts_report_each_winning_write_once() {
    let (store, _) = store();
    let events = store
        .put_many(
            "ES",
            Timeframe::M1,
            vec![
                cached("yahoo", 1, 450_000),
                cached("polygon", 1, 450_100),
                cached("yahoo", 2, 449_990),
            ],
        )
        .await
        .unwrap();
    // initial (yahoo), override (polygon); yahoo's second revision loses.
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, CorrectionKind::Initial);
    assert_eq!(events[1].kind, CorrectionKind::ProviderOverride);
}

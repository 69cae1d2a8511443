use assert_cmd::Command;
use predicates::prelude::*;
use rust_decimal::Decimal;

use candela_core::merge::ProviderRank;
use candela_core::{Bar, CachedBar, Timeframe, now_ms};
use candela_store::{ColdStore, SqliteStore};

const M5: i64 = 5 * 60_000;

fn cached(ts: i64, provider: &str, revision: u32, close_cents: i64, fetched_at: i64) -> CachedBar {
    CachedBar {
        bar: Bar {
            ts,
            open: Decimal::new(10_000, 2),
            high: Decimal::new(10_100, 2),
            low: Decimal::new(9_900, 2),
            close: Decimal::new(close_cents, 2),
            volume: 1_000,
        },
        provider: provider.to_string(),
        revision,
        fetched_at,
    }
}

fn cmd() -> Command {
    Command::cargo_bin("cache-verify").unwrap()
}

#[test]
fn unreachable_cache_exits_2() {
    cmd()
        .args([
            "--db",
            "sqlite:/definitely/not/a/real/dir/bars.db",
            "--symbol",
            "AAPL",
            "--timeframe",
            "5m",
        ])
        .assert()
        .code(2);
}

#[test]
fn empty_cache_is_clean() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("bars.db").display());
    let _ = SqliteStore::open(&url).unwrap();

    cmd()
        .args(["--db", &url, "--symbol", "AAPL", "--timeframe", "5m"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("\"bars\":0"));
}

#[test]
fn historical_bars_without_corrections_are_clean() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("bars.db").display());
    let store = SqliteStore::open(&url).unwrap();
    let rank = ProviderRank::new(["polygon"]);

    let base = Timeframe::M5.floor(1_700_000_000_000);
    let bars: Vec<CachedBar> = (0..4)
        .map(|i| cached(base + i * M5, "polygon", 1, 10_050, base))
        .collect();
    store.put_many("AAPL", Timeframe::M5, &bars, &rank).unwrap();

    cmd()
        .args([
            "--db",
            &url,
            "--symbol",
            "AAPL",
            "--timeframe",
            "5m",
            "--priority",
            "polygon",
            "--pretty",
        ])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("\"bars\": 4"))
        .stdout(predicate::str::contains("\"fresh\": 4"))
        .stdout(predicate::str::contains("\"polygon\": 4"));
}

#[test]
fn revisions_surface_as_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("bars.db").display());
    let store = SqliteStore::open(&url).unwrap();
    let rank = ProviderRank::new(["polygon"]);

    let base = Timeframe::M5.floor(1_700_000_000_000);
    store
        .put_many(
            "AAPL",
            Timeframe::M5,
            &[cached(base, "polygon", 1, 10_050, base)],
            &rank,
        )
        .unwrap();
    store
        .put_many(
            "AAPL",
            Timeframe::M5,
            &[cached(base, "polygon", 2, 10_080, base)],
            &rank,
        )
        .unwrap();

    cmd()
        .args([
            "--db",
            &url,
            "--symbol",
            "AAPL",
            "--timeframe",
            "5m",
            "--priority",
            "polygon",
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"kind\":\"revision\""))
        .stdout(predicate::str::contains("100.5"))
        .stdout(predicate::str::contains("100.8"));
}

#[test]
fn stale_live_bars_surface_as_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("bars.db").display());
    let store = SqliteStore::open(&url).unwrap();
    let rank = ProviderRank::new(["polygon"]);

    // A recent bar fetched two hours ago: past the 15-minute TTL for 5m.
    let now = now_ms();
    let ts = Timeframe::M5.floor(now - 3_600_000);
    store
        .put_many(
            "AAPL",
            Timeframe::M5,
            &[cached(ts, "polygon", 1, 10_050, now - 2 * 3_600_000)],
            &rank,
        )
        .unwrap();

    cmd()
        .args(["--db", &url, "--symbol", "AAPL", "--timeframe", "5m"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"stale\":1"));
}

#[test]
fn vendor_symbol_formats_are_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("bars.db").display());
    let store = SqliteStore::open(&url).unwrap();
    let rank = ProviderRank::new(["polygon"]);

    let base = Timeframe::M5.floor(1_700_000_000_000);
    store
        .put_many(
            "ES",
            Timeframe::M5,
            &[cached(base, "polygon", 1, 450_000, base)],
            &rank,
        )
        .unwrap();

    cmd()
        .args(["--db", &url, "--symbol", "es=f", "--timeframe", "5m"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("\"symbol\":\"ES\""));
}

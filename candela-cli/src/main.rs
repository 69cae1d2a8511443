//! `cache-verify`: offline, read-only walk of the cold tier for one
//! `(symbol, timeframe, window)`.
//!
//! Exit codes: `0` clean, `1` warnings (stale bars or corrections present),
//! `2` cache unreachable or unusable input.

use std::collections::BTreeMap;
use std::process::ExitCode;

use clap::Parser;

use candela_core::merge::ProviderRank;
use candela_core::symbol::SymbolNormalizer;
use candela_core::{FreshnessPolicy, Timeframe, freshness::is_stale, now_ms};
use candela_store::{ColdStore, SqliteStore, winner_of};

#[derive(Debug, Parser)]
#[command(
    name = "cache-verify",
    about = "Verify cached bars: freshness, revisions, providers, corrections"
)]
struct Args {
    /// Cold store connection string (sqlite:<path>).
    #[arg(long, default_value = "sqlite:bars.db")]
    db: String,

    /// Symbol to inspect (vendor formats accepted).
    #[arg(long)]
    symbol: String,

    /// Timeframe to inspect (1m, 5m, 10m, 15m, 30m, 1h, 2h, 4h, 1D).
    #[arg(long)]
    timeframe: Timeframe,

    /// Number of buckets to walk back from the latest stored bar.
    #[arg(long, default_value_t = 100)]
    window: u32,

    /// Provider priority for winner selection, highest first.
    #[arg(long, value_delimiter = ',')]
    priority: Vec<String>,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("cache-verify: {e}");
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<ExitCode, candela_core::CandelaError> {
    let symbol = SymbolNormalizer::default().normalize(&args.symbol)?;
    let key = symbol.to_string();
    let store = SqliteStore::open(&args.db)?;
    let rank = ProviderRank::new(args.priority.clone());
    let timeframe = args.timeframe;
    let step = timeframe.duration_ms();

    let Some(latest) = store.latest_ts(&key, timeframe)? else {
        emit(
            args,
            &serde_json::json!({
                "symbol": key,
                "timeframe": timeframe.as_str(),
                "bars": 0,
                "rows": 0,
                "fresh": 0,
                "stale": 0,
                "revisions": {},
                "providers": {},
                "corrections": [],
            }),
        );
        return Ok(ExitCode::SUCCESS);
    };

    let from = latest - i64::from(args.window.saturating_sub(1)) * step;
    let rows = store.rows_in(&key, timeframe, from, latest)?;
    // Initial inserts are recorded in the audit table but are not
    // corrections: only revisions and overrides changed a returned bar.
    let corrections: Vec<_> = store
        .corrections_in(&key, timeframe, from, latest)?
        .into_iter()
        .filter(|c| c.kind != candela_core::CorrectionKind::Initial)
        .collect();

    let policy = FreshnessPolicy::default();
    let now = now_ms();
    let mut fresh = 0usize;
    let mut stale = 0usize;
    let mut winners = 0usize;
    let mut revisions: BTreeMap<String, usize> = BTreeMap::new();
    let mut providers: BTreeMap<String, usize> = BTreeMap::new();

    let mut idx = 0;
    while idx < rows.len() {
        let ts = rows[idx].ts();
        let mut end = idx;
        while end < rows.len() && rows[end].ts() == ts {
            end += 1;
        }
        if let Some(winner) = winner_of(rows[idx..end].iter(), &rank) {
            winners += 1;
            if is_stale(&winner, timeframe, &policy, now) {
                stale += 1;
            } else {
                fresh += 1;
            }
            *revisions.entry(winner.revision.to_string()).or_default() += 1;
            *providers.entry(winner.provider.clone()).or_default() += 1;
        }
        idx = end;
    }

    let bar_json = |bar: &candela_core::CachedBar| {
        serde_json::json!({
            "provider": bar.provider,
            "revision": bar.revision,
            "open": bar.bar.open.to_string(),
            "high": bar.bar.high.to_string(),
            "low": bar.bar.low.to_string(),
            "close": bar.bar.close.to_string(),
            "volume": bar.bar.volume,
        })
    };
    let corrections_json: Vec<serde_json::Value> = corrections
        .iter()
        .map(|c| {
            serde_json::json!({
                "ts": c.ts,
                "kind": c.kind.as_str(),
                "detected_at": c.detected_at,
                "old": c.old.as_ref().map(&bar_json),
                "new": bar_json(&c.new),
            })
        })
        .collect();

    let report = serde_json::json!({
        "symbol": key,
        "timeframe": timeframe.as_str(),
        "window": { "from": from, "to": latest, "buckets": args.window },
        "bars": winners,
        "rows": rows.len(),
        "fresh": fresh,
        "stale": stale,
        "revisions": revisions,
        "providers": providers,
        "corrections": corrections_json,
    });
    emit(args, &report);

    if stale > 0 || !corrections.is_empty() {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn emit(args: &Args, report: &serde_json::Value) {
    let rendered = if args.pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    };
    match rendered {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("cache-verify: failed to render report: {e}"),
    }
}

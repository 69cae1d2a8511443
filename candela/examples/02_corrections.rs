//! Watch correction events as late revisions and provider overrides arrive.
//!
//! ```sh
//! cargo run -p candela --example 02_corrections
//! ```

use std::sync::Arc;

use candela::{Bar, CachedBar, Candela, Timeframe};
use candela_core::now_ms;
use candela_mock::DynamicConnector;
use rust_decimal::Decimal;

fn bar(ts: i64, close_cents: i64) -> Bar {
    Bar {
        ts,
        open: Decimal::new(450_000, 2),
        high: Decimal::new(450_200, 2),
        low: Decimal::new(449_800, 2),
        close: Decimal::new(close_cents, 2),
        volume: 1_200,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let service = Candela::builder()
        .with_connector(Arc::new(DynamicConnector::new("polygon")))
        .with_connector(Arc::new(DynamicConnector::new("yahoo")))
        .provider_priority(["polygon", "yahoo"])
        .build()?;

    let _sub = service.subscribe(|event| {
        println!(
            "correction: {} {} @ {} -> {} (by {})",
            event.kind,
            event.symbol,
            event.ts,
            event.new.bar.close,
            event.new.provider,
        );
    });

    let ts = Timeframe::M1.floor(now_ms() - 3_600_000);
    let stamp = |provider: &str, revision, close| CachedBar {
        bar: bar(ts, close),
        provider: provider.to_string(),
        revision,
        fetched_at: now_ms(),
    };

    // First sighting from the secondary provider.
    service.upsert("ES", Timeframe::M1, vec![stamp("yahoo", 1, 450_050)]).await?;
    // The same provider corrects its own bar.
    service.upsert("ES", Timeframe::M1, vec![stamp("yahoo", 2, 450_075)]).await?;
    // The primary provider weighs in and takes over.
    service.upsert("ES", Timeframe::M1, vec![stamp("polygon", 1, 450_100)]).await?;
    // A late, lower-priority revision changes nothing.
    let quiet = service
        .upsert("ES", Timeframe::M1, vec![stamp("yahoo", 3, 449_900)])
        .await?;
    println!("late yahoo revision produced {} event(s)", quiet.len());

    Ok(())
}

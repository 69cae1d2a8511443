//! Query a bar range twice: the first call fetches through the composite,
//! the second is served entirely from the cache.
//!
//! ```sh
//! cargo run -p candela --example 01_cached_history
//! ```

use std::sync::Arc;

use candela::{Candela, QueryOptions, Timeframe};
use candela_core::now_ms;
use candela_mock::MockConnector;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("candela=debug")
        .init();

    let service = Candela::builder()
        .with_connector(Arc::new(MockConnector::new()))
        .store_url("sqlite::memory:")
        .build()?;

    let to = now_ms();
    let from = to - 2 * 3_600_000;

    let first = service
        .query("AAPL", Timeframe::M10, from, to, QueryOptions::default())
        .await?;
    println!(
        "first call: {} bars, {} refresh route(s)",
        first.bars.len(),
        first.routes.len()
    );
    if let Some(route) = first.routes.first() {
        println!("  served by {:?}", route.served_by);
    }

    let second = service
        .query("AAPL", Timeframe::M10, from, to, QueryOptions::default())
        .await?;
    println!(
        "second call: {} bars, {} refresh route(s) (cache hit)",
        second.bars.len(),
        second.routes.len()
    );

    Ok(())
}

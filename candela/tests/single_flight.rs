use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use candela::{
    Bar, BarProvider, BarRequest, Candela, CandelaConnector, CandelaError, ProviderCapabilities,
    QueryOptions, Timeframe,
};
use candela_core::now_ms;
use candela_mock::fixtures;

// Serves fixture bars after a short delay so concurrent queries overlap.
struct SlowConnector {
    calls: Arc<AtomicUsize>,
}

impl CandelaConnector for SlowConnector {
    fn name(&self) -> &'static str {
        "slow"
    }
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supported_timeframes: Timeframe::ALL.to_vec(),
            ..ProviderCapabilities::default()
        }
    }
    fn as_bar_provider(&self) -> Option<&dyn BarProvider> {
        Some(self as &dyn BarProvider)
    }
}

#[async_trait]
impl BarProvider for SlowConnector {
    async fn bars(&self, req: &BarRequest) -> Result<Vec<Bar>, CandelaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(fixtures::bars_for(
            &req.symbol.to_string(),
            req.timeframe,
            req.from,
            req.to,
        ))
    }
}

#[tokio::test]
async fn concurrent_identical_queries_share_one_provider_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = Candela::builder()
        .with_connector(Arc::new(SlowConnector {
            calls: calls.clone(),
        }))
        .build()
        .unwrap();

    let t = Timeframe::M5.floor(now_ms() - 3_600_000);
    let to = t + 5 * 5 * 60_000;

    let (a, b) = tokio::join!(
        svc.query("AAPL", Timeframe::M5, t, to, QueryOptions::default()),
        svc.query("AAPL", Timeframe::M5, t, to, QueryOptions::default()),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.bars, b.bars);
    assert_eq!(a.bars.len(), 6);
    assert!(!a.partial && !b.partial);
}

#[tokio::test]
async fn distinct_ranges_do_not_coalesce() {
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = Candela::builder()
        .with_connector(Arc::new(SlowConnector {
            calls: calls.clone(),
        }))
        .build()
        .unwrap();

    let t = Timeframe::M5.floor(now_ms() - 3_600_000);
    let step = 5 * 60_000;

    let (a, b) = tokio::join!(
        svc.query("AAPL", Timeframe::M5, t, t + step, QueryOptions::default()),
        svc.query("MSFT", Timeframe::M5, t, t + step, QueryOptions::default()),
    );
    a.unwrap();
    b.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

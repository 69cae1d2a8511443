use candela_core::connector::CandelaConnector;
use candela_core::{BarRequest, CandelaError, CanonicalSymbol, Timeframe};
use candela_mock::{DynamicConnector, MockBehavior, fixtures};

fn request(symbol: &str, from: i64, to: i64) -> BarRequest {
    BarRequest {
        symbol: CanonicalSymbol::Ticker(symbol.to_string()),
        timeframe: Timeframe::M5,
        from,
        to,
        limit: None,
    }
}

#[test]
fn fixtures_are_deterministic_and_valid() {
    let a = fixtures::bars_for("AAPL", Timeframe::M5, 0, 20 * 300_000);
    let b = fixtures::bars_for("AAPL", Timeframe::M5, 0, 20 * 300_000);
    assert_eq!(a, b);
    assert_eq!(a.len(), 21);
    for bar in &a {
        bar.validate(Timeframe::M5).unwrap();
    }
    // Different symbols produce different series.
    let other = fixtures::bars_for("MSFT", Timeframe::M5, 0, 20 * 300_000);
    assert_ne!(a, other);
}

#[tokio::test]
async fn scripted_failures_and_call_log() {
    let connector = DynamicConnector::new("scripted");
    let controller = connector.controller();
    controller.set_bars(
        "AAPL",
        MockBehavior::Fail(CandelaError::provider("scripted", "down")),
    );

    let provider = connector.as_bar_provider().unwrap();
    let err = provider.bars(&request("AAPL", 0, 300_000)).await.unwrap_err();
    assert!(matches!(err, CandelaError::Provider { .. }));

    // Unscripted symbols fall back to fixtures.
    let bars = provider.bars(&request("MSFT", 0, 300_000)).await.unwrap();
    assert_eq!(bars.len(), 2);

    assert_eq!(controller.bars_calls(), 2);
    let log = controller.bar_requests();
    assert_eq!(log[0].symbol.to_string(), "AAPL");
    assert_eq!(log[1].symbol.to_string(), "MSFT");
}

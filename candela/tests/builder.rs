use std::sync::Arc;

use candela::{CandelaError, Candela, ProviderCapabilities, Timeframe};
use candela_mock::DynamicConnector;

#[test]
fn at_least_one_connector_is_required() {
    let err = Candela::builder().build().unwrap_err();
    assert!(matches!(err, CandelaError::InvalidArg(_)));
}

#[test]
fn priority_list_must_reference_registered_connectors() {
    let err = Candela::builder()
        .with_connector(Arc::new(DynamicConnector::new("polygon")))
        .provider_priority(["polygon", "bloomberg"])
        .build()
        .unwrap_err();
    match err {
        CandelaError::InvalidArg(msg) => assert!(msg.contains("bloomberg")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unknown_store_schemes_are_rejected() {
    let err = Candela::builder()
        .with_connector(Arc::new(DynamicConnector::new("polygon")))
        .store_url("postgres://localhost/bars")
        .build()
        .unwrap_err();
    assert!(matches!(err, CandelaError::InvalidArg(_)));
}

#[test]
fn adapter_declared_priorities_order_the_default_rank() {
    // No explicit priority list: capabilities.priority decides, registration
    // order breaking ties.
    let secondary = DynamicConnector::new("secondary").with_capabilities(ProviderCapabilities {
        supported_timeframes: Timeframe::ALL.to_vec(),
        priority: 20,
        ..ProviderCapabilities::default()
    });
    let primary = DynamicConnector::new("primary").with_capabilities(ProviderCapabilities {
        supported_timeframes: Timeframe::ALL.to_vec(),
        priority: 10,
        ..ProviderCapabilities::default()
    });

    let svc = Candela::builder()
        .with_connector(Arc::new(secondary))
        .with_connector(Arc::new(primary))
        .build()
        .unwrap();
    assert_eq!(svc.store().rank().order(), ["primary", "secondary"]);
}

//! Deterministic mock connectors for candela tests and examples.
#![warn(missing_docs)]

/// Deterministic fixture data.
pub mod fixtures;

mod dynamic;

pub use dynamic::{DynamicConnector, DynamicController, MockBehavior};

use async_trait::async_trait;

use candela_core::connector::{BarProvider, CandelaConnector, QuoteProvider};
use candela_core::{
    Bar, BarRequest, CandelaError, CanonicalSymbol, ProviderCapabilities, QuoteTick, Timeframe,
    now_ms,
};

/// CI-safe connector serving deterministic fixture bars for any symbol.
///
/// Native timeframes deliberately exclude the aggregation cadences
/// (`10m`, `2h`, `4h`) so routing through the aggregation path is exercised.
pub struct MockConnector;

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    /// Create the connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn maybe_fail(symbol: &CanonicalSymbol, capability: &'static str) -> Result<(), CandelaError> {
        match symbol.to_string().as_str() {
            "FAIL" => Err(CandelaError::provider(
                "candela-mock",
                format!("forced failure: {capability}"),
            )),
            "LIMIT" => Err(CandelaError::rate_limited("candela-mock", None)),
            _ => Ok(()),
        }
    }
}

impl CandelaConnector for MockConnector {
    fn name(&self) -> &'static str {
        "candela-mock"
    }

    fn vendor(&self) -> &'static str {
        "Mock"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supported_timeframes: vec![
                Timeframe::M1,
                Timeframe::M5,
                Timeframe::M15,
                Timeframe::M30,
                Timeframe::H1,
                Timeframe::D1,
            ],
            max_bars_per_request: 10_000,
            priority: 50,
            ..ProviderCapabilities::default()
        }
    }

    fn as_bar_provider(&self) -> Option<&dyn BarProvider> {
        Some(self as &dyn BarProvider)
    }

    fn as_quote_provider(&self) -> Option<&dyn QuoteProvider> {
        Some(self as &dyn QuoteProvider)
    }
}

#[async_trait]
impl BarProvider for MockConnector {
    async fn bars(&self, req: &BarRequest) -> Result<Vec<Bar>, CandelaError> {
        Self::maybe_fail(&req.symbol, "bars")?;
        let mut bars = fixtures::bars_for(
            &req.symbol.to_string(),
            req.timeframe,
            req.from,
            req.to,
        );
        if let Some(limit) = req.limit {
            bars.truncate(limit);
        }
        Ok(bars)
    }
}

#[async_trait]
impl QuoteProvider for MockConnector {
    async fn quote(&self, symbol: &CanonicalSymbol) -> Result<QuoteTick, CandelaError> {
        Self::maybe_fail(symbol, "quote")?;
        let now = now_ms();
        let bar = fixtures::bars_for(&symbol.to_string(), Timeframe::M1, now - 60_000, now)
            .pop()
            .ok_or_else(|| CandelaError::not_found(format!("quote for {symbol}")))?;
        Ok(QuoteTick {
            price: bar.close,
            ts: bar.ts,
        })
    }
}

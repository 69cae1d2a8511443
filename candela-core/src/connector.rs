use async_trait::async_trait;

use candela_types::{
    Bar, BarRequest, CandelaError, CanonicalSymbol, ProviderCapabilities, QuoteTick,
};

/// Focused role trait for connectors that provide historical OHLCV bars.
///
/// Contract:
/// - Bars are returned ascending by timestamp, aligned to the requested
///   timeframe grid, each satisfying the OHLC invariants.
/// - Adapters are stateless with respect to the cache; they must not cache.
#[async_trait]
pub trait BarProvider: Send + Sync {
    /// Fetch bars for the given request window.
    async fn bars(&self, req: &BarRequest) -> Result<Vec<Bar>, CandelaError>;
}

/// Focused role trait for connectors that provide live quotes.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetch a point-in-time quote for the given symbol.
    async fn quote(&self, symbol: &CanonicalSymbol) -> Result<QuoteTick, CandelaError>;
}

/// Main connector trait implemented by provider adapters. Exposes capability
/// discovery; the composite router needs no knowledge of the backend.
pub trait CandelaConnector: Send + Sync {
    /// A stable identifier used in priority lists and stored provenance
    /// (e.g. "polygon", "yahoo").
    fn name(&self) -> &'static str;

    /// Human-friendly vendor string.
    fn vendor(&self) -> &'static str {
        "unknown"
    }

    /// Static description of what this adapter can serve.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Advertise bar history capability by returning a usable trait object
    /// reference when supported.
    fn as_bar_provider(&self) -> Option<&dyn BarProvider> {
        None
    }

    /// Advertise quote capability by returning a usable trait object
    /// reference when supported.
    fn as_quote_provider(&self) -> Option<&dyn QuoteProvider> {
        None
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use candela_core::connector::{BarProvider, CandelaConnector, QuoteProvider};
use candela_core::{
    Bar, BarRequest, CandelaError, CanonicalSymbol, ProviderCapabilities, QuoteTick, Timeframe,
};

use crate::fixtures;

/// Instruction for how a method should behave for a given symbol.
#[derive(Clone)]
pub enum MockBehavior<T> {
    /// Return the provided value immediately.
    Return(T),
    /// Fail immediately with the provided error.
    Fail(CandelaError),
    /// Hang indefinitely (simulate a stalled backend).
    Hang,
}

#[derive(Default)]
struct InternalState {
    bar_rules: HashMap<String, MockBehavior<Vec<Bar>>>,
    quote_rules: HashMap<String, MockBehavior<QuoteTick>>,
    bar_requests: Vec<BarRequest>,
    quote_calls: usize,
}

/// Controller handle used by tests to drive the dynamic connector from the
/// outside and observe the calls it received.
#[derive(Clone)]
pub struct DynamicController {
    state: Arc<Mutex<InternalState>>,
}

impl DynamicController {
    /// Set the behavior for `bars` calls for a specific symbol string.
    pub fn set_bars(&self, symbol: impl Into<String>, behavior: MockBehavior<Vec<Bar>>) {
        if let Ok(mut guard) = self.state.lock() {
            guard.bar_rules.insert(symbol.into(), behavior);
        }
    }

    /// Set the behavior for `quote` calls for a specific symbol string.
    pub fn set_quote(&self, symbol: impl Into<String>, behavior: MockBehavior<QuoteTick>) {
        if let Ok(mut guard) = self.state.lock() {
            guard.quote_rules.insert(symbol.into(), behavior);
        }
    }

    /// Number of `bars` calls observed.
    #[must_use]
    pub fn bars_calls(&self) -> usize {
        self.state.lock().map_or(0, |g| g.bar_requests.len())
    }

    /// Every `bars` request observed, in arrival order.
    #[must_use]
    pub fn bar_requests(&self) -> Vec<BarRequest> {
        self.state.lock().map_or_else(|_| Vec::new(), |g| g.bar_requests.clone())
    }

    /// Number of `quote` calls observed.
    #[must_use]
    pub fn quote_calls(&self) -> usize {
        self.state.lock().map_or(0, |g| g.quote_calls)
    }
}

/// Scripted connector whose behavior and capabilities are set per test.
///
/// Unscripted symbols fall back to deterministic fixture bars.
pub struct DynamicConnector {
    name: &'static str,
    caps: ProviderCapabilities,
    serve_quotes: bool,
    state: Arc<Mutex<InternalState>>,
}

impl DynamicConnector {
    /// A connector named `name` serving every timeframe natively.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            caps: ProviderCapabilities {
                supported_timeframes: Timeframe::ALL.to_vec(),
                ..ProviderCapabilities::default()
            },
            serve_quotes: true,
            state: Arc::new(Mutex::new(InternalState::default())),
        }
    }

    /// Replace the advertised capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, caps: ProviderCapabilities) -> Self {
        self.caps = caps;
        self
    }

    /// Restrict native timeframes.
    #[must_use]
    pub fn with_timeframes(mut self, timeframes: impl Into<Vec<Timeframe>>) -> Self {
        self.caps.supported_timeframes = timeframes.into();
        self
    }

    /// Disable the quote capability.
    #[must_use]
    pub const fn without_quotes(mut self) -> Self {
        self.serve_quotes = false;
        self
    }

    /// A controller sharing this connector's state.
    #[must_use]
    pub fn controller(&self) -> DynamicController {
        DynamicController {
            state: Arc::clone(&self.state),
        }
    }
}

impl CandelaConnector for DynamicConnector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn vendor(&self) -> &'static str {
        "Dynamic"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.caps.clone()
    }

    fn as_bar_provider(&self) -> Option<&dyn BarProvider> {
        Some(self as &dyn BarProvider)
    }

    fn as_quote_provider(&self) -> Option<&dyn QuoteProvider> {
        self.serve_quotes.then_some(self as &dyn QuoteProvider)
    }
}

#[async_trait]
impl BarProvider for DynamicConnector {
    async fn bars(&self, req: &BarRequest) -> Result<Vec<Bar>, CandelaError> {
        let behavior = {
            let Ok(mut guard) = self.state.lock() else {
                return Err(CandelaError::provider(self.name, "mock state poisoned"));
            };
            guard.bar_requests.push(req.clone());
            guard.bar_rules.get(&req.symbol.to_string()).cloned()
        };
        match behavior {
            Some(MockBehavior::Return(bars)) => Ok(bars),
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Hang) => {
                std::future::pending::<()>().await;
                unreachable!("pending future resolved")
            }
            None => Ok(fixtures::bars_for(
                &req.symbol.to_string(),
                req.timeframe,
                req.from,
                req.to,
            )),
        }
    }
}

#[async_trait]
impl QuoteProvider for DynamicConnector {
    async fn quote(&self, symbol: &CanonicalSymbol) -> Result<QuoteTick, CandelaError> {
        let behavior = {
            let Ok(mut guard) = self.state.lock() else {
                return Err(CandelaError::provider(self.name, "mock state poisoned"));
            };
            guard.quote_calls += 1;
            guard.quote_rules.get(&symbol.to_string()).cloned()
        };
        match behavior {
            Some(MockBehavior::Return(tick)) => Ok(tick),
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Hang) => {
                std::future::pending::<()>().await;
                unreachable!("pending future resolved")
            }
            None => Err(CandelaError::not_found(format!("quote for {symbol}"))),
        }
    }
}

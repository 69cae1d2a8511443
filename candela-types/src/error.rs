use std::time::Duration;

use thiserror::Error;

/// Unified error type for the candela workspace.
///
/// Wraps input validation failures, provider-tagged failures with their retry
/// semantics, store failures, and an aggregate for multi-provider attempts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CandelaError {
    /// The requested capability is not implemented by the target connector.
    #[error("unsupported capability: {capability}")]
    Unsupported {
        /// Capability label describing what was requested.
        capability: &'static str,
    },

    /// Invalid input argument (reversed range, empty priority list, ...).
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// A timeframe string outside the closed set.
    #[error("unknown timeframe: {0}")]
    UnknownTimeframe(String),

    /// A symbol could not be normalized or resolved to a contract.
    #[error("symbol resolution failed: {0}")]
    Symbol(String),

    /// Issues with returned or stored data (invariant violations, etc.).
    #[error("data issue: {0}")]
    Data(String),

    /// The backend throttled the request; retryable.
    #[error("{provider} rate limited")]
    RateLimited {
        /// Provider that throttled.
        provider: String,
        /// Vendor-suggested wait before retrying, when advertised.
        retry_after: Option<Duration>,
    },

    /// The adapter returned fewer bars than requested and has no more for the
    /// window; non-retryable for that adapter.
    #[error("{provider} returned {returned} bars, requested {requested}")]
    InsufficientBars {
        /// Provider that came up short.
        provider: String,
        /// Bars actually returned.
        returned: usize,
        /// Bars requested.
        requested: usize,
    },

    /// Transport or backend failure from an individual provider; retryable.
    #[error("{provider} failed: {msg}")]
    Provider {
        /// Provider name that failed.
        provider: String,
        /// Human-readable error message.
        msg: String,
    },

    /// An individual provider call exceeded the configured timeout.
    #[error("provider timed out: {capability} via {provider}")]
    ProviderTimeout {
        /// Provider name that timed out.
        provider: String,
        /// Capability label (e.g. "bars", "quote").
        capability: &'static str,
    },

    /// The overall request exceeded the configured deadline.
    #[error("request timed out: {capability}")]
    RequestTimeout {
        /// Capability label for which the request timed out.
        capability: &'static str,
    },

    /// Persistent tier failure.
    #[error("store error: {0}")]
    Store(String),

    /// A resource or symbol could not be found.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing resource.
        what: String,
    },

    /// All selected providers failed; contains the individual failures.
    #[error("all providers failed: {0:?}")]
    AllProvidersFailed(Vec<CandelaError>),
}

impl CandelaError {
    /// Helper: build an `Unsupported` error for a capability string.
    #[must_use]
    pub const fn unsupported(cap: &'static str) -> Self {
        Self::Unsupported { capability: cap }
    }

    /// Helper: build a `Provider` error with the provider name and message.
    pub fn provider(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `RateLimited` error.
    pub fn rate_limited(provider: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            retry_after,
        }
    }

    /// Helper: build a `NotFound` error for a description of the missing resource.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Helper: build a `ProviderTimeout` error.
    pub fn provider_timeout(provider: impl Into<String>, capability: &'static str) -> Self {
        Self::ProviderTimeout {
            provider: provider.into(),
            capability,
        }
    }

    /// Helper: build a `Store` error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Whether the failure is transient and worth retrying against the same
    /// provider after a backoff.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Provider { .. } | Self::ProviderTimeout { .. }
        )
    }
}

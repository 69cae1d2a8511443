use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use candela_core::bus::{EventBus, Topic};
use candela_core::connector::CandelaConnector;
use candela_core::merge::ProviderRank;
use candela_core::symbol::SymbolNormalizer;
use candela_core::{
    BackoffConfig, CandelaConfig, CandelaError, CorrectionEvent, FreshnessPolicy, RolloverRule,
    Subscription,
};
use candela_store::{SqliteStore, TieredStore};

use crate::flight::FlightMap;
use crate::router::Composite;

/// The cache service: the single entry point consumers query bars through.
pub struct Candela {
    pub(crate) cfg: Arc<CandelaConfig>,
    pub(crate) store: Arc<TieredStore>,
    pub(crate) bus: Arc<EventBus>,
    pub(crate) composite: Arc<Composite>,
    pub(crate) normalizer: SymbolNormalizer,
    pub(crate) flights: FlightMap,
}

impl std::fmt::Debug for Candela {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candela").finish_non_exhaustive()
    }
}

/// Builder for constructing a [`Candela`] service with custom configuration.
pub struct CandelaBuilder {
    connectors: Vec<Arc<dyn CandelaConnector>>,
    cfg: CandelaConfig,
}

impl Default for CandelaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CandelaBuilder {
    /// Create a new builder with defaults: in-memory cold store, 10,000-entry
    /// hot tier, default freshness TTLs, 5s provider timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connectors: vec![],
            cfg: CandelaConfig::default(),
        }
    }

    /// Register a provider connector. Registration order breaks priority
    /// ties and is the fallback order when no priority list is configured.
    #[must_use]
    pub fn with_connector(mut self, c: Arc<dyn CandelaConnector>) -> Self {
        self.connectors.push(c);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, cfg: CandelaConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Ordered provider identifiers; lower index is higher priority. Every
    /// name must match a registered connector.
    #[must_use]
    pub fn provider_priority<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cfg.provider_priority = order.into_iter().map(Into::into).collect();
        self
    }

    /// Override the freshness policy.
    #[must_use]
    pub fn freshness(mut self, policy: FreshnessPolicy) -> Self {
        self.cfg.freshness = policy;
        self
    }

    /// Hot-tier entry cap.
    #[must_use]
    pub const fn hot_capacity(mut self, capacity: u64) -> Self {
        self.cfg.hot_cache_capacity = capacity;
        self
    }

    /// Cold store connection string (`sqlite:<path>` or `sqlite::memory:`).
    #[must_use]
    pub fn store_url(mut self, url: impl Into<String>) -> Self {
        self.cfg.cold_store_url = url.into();
        self
    }

    /// Replace the per-root rollover rule table.
    #[must_use]
    pub fn rollover_rules(mut self, rules: HashMap<String, RolloverRule>) -> Self {
        self.cfg.rollover = rules;
        self
    }

    /// Set the per-provider request timeout.
    #[must_use]
    pub const fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.provider_timeout = timeout;
        self
    }

    /// Bound the total refresh work of a single query.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.request_timeout = Some(timeout);
        self
    }

    /// Backoff settings for retrying transient provider failures.
    #[must_use]
    pub const fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.cfg.backoff = backoff;
        self
    }

    /// Bounded attempts per provider call.
    #[must_use]
    pub const fn retry_attempts(mut self, attempts: u32) -> Self {
        self.cfg.retry_attempts = attempts;
        self
    }

    /// Build the service: validates the priority list, opens the cold store,
    /// and wires the composite router.
    ///
    /// # Errors
    /// - `InvalidArg` if no connectors are registered, or the priority list
    ///   references unregistered connector names.
    /// - `Store` when the cold store cannot be opened or migrated.
    pub fn build(self) -> Result<Candela, CandelaError> {
        if self.connectors.is_empty() {
            return Err(CandelaError::InvalidArg(
                "no connectors registered; add at least one via with_connector(...)".to_string(),
            ));
        }

        let known: HashSet<&'static str> = self.connectors.iter().map(|c| c.name()).collect();
        let unknown: Vec<&str> = self
            .cfg
            .provider_priority
            .iter()
            .map(String::as_str)
            .filter(|name| !known.contains(*name))
            .collect();
        if !unknown.is_empty() {
            return Err(CandelaError::InvalidArg(format!(
                "provider priority references unknown connectors: {}",
                unknown.join(", ")
            )));
        }

        // No explicit list: fall back to adapter-declared priorities with
        // registration order breaking ties.
        let order: Vec<String> = if self.cfg.provider_priority.is_empty() {
            let mut ranked: Vec<(u8, usize, &'static str)> = self
                .connectors
                .iter()
                .enumerate()
                .map(|(idx, c)| (c.capabilities().priority, idx, c.name()))
                .collect();
            ranked.sort_unstable();
            ranked.into_iter().map(|(_, _, name)| name.to_string()).collect()
        } else {
            self.cfg.provider_priority.clone()
        };
        let rank = Arc::new(ProviderRank::new(order));

        let cold = Arc::new(SqliteStore::open(&self.cfg.cold_store_url)?);
        let store = Arc::new(TieredStore::new(
            cold,
            (*rank).clone(),
            self.cfg.hot_cache_capacity,
        ));

        let mut normalizer = SymbolNormalizer::default();
        for root in self.cfg.rollover.keys() {
            normalizer = normalizer.with_root(root.clone());
        }

        let composite = Arc::new(Composite::new(
            self.connectors,
            rank,
            self.cfg.provider_timeout,
            self.cfg.backoff,
            self.cfg.retry_attempts,
        ));

        Ok(Candela {
            cfg: Arc::new(self.cfg),
            store,
            bus: Arc::new(EventBus::new()),
            composite,
            normalizer,
            flights: FlightMap::new(),
        })
    }
}

impl Candela {
    /// Start building a new `Candela` service.
    #[must_use]
    pub fn builder() -> CandelaBuilder {
        CandelaBuilder::new()
    }

    /// Register a correction listener; the returned guard unsubscribes on
    /// drop. Listeners run synchronously on the write path and should not do
    /// I/O.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&CorrectionEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(Topic::Correction, listener)
    }

    /// Number of live correction listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.bus.listener_count(Topic::Correction)
    }

    /// The underlying two-tier store.
    #[must_use]
    pub fn store(&self) -> &Arc<TieredStore> {
        &self.store
    }

    /// The effective configuration.
    #[must_use]
    pub fn config(&self) -> &CandelaConfig {
        &self.cfg
    }
}

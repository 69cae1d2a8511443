use moka::sync::Cache;

use candela_core::{CachedBar, Timeframe};

/// Composite key of the hot tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HotKey {
    /// Canonical symbol string.
    pub symbol: String,
    /// Bar cadence.
    pub timeframe: Timeframe,
    /// Bucket start, UTC ms.
    pub ts: i64,
    /// Provider that produced the bar.
    pub provider: String,
}

/// Size-bounded in-memory tier holding the currently winning bar per
/// timestamp. Rebuilt lazily from the cold tier on miss.
pub struct HotTier {
    cache: Cache<HotKey, CachedBar>,
}

impl HotTier {
    /// Create a tier bounded to `capacity` entries (clamped to at least one).
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(capacity.max(1)).build();
        tracing::debug!(
            target = "candela::store",
            event = "hot_init",
            max_capacity = capacity.max(1),
            "initialized hot tier"
        );
        Self { cache }
    }

    pub(crate) fn get(&self, key: &HotKey) -> Option<CachedBar> {
        self.cache.get(key)
    }

    pub(crate) fn insert(&self, key: HotKey, bar: CachedBar) {
        self.cache.insert(key, bar);
    }

    pub(crate) fn invalidate(&self, key: &HotKey) {
        self.cache.invalidate(key);
    }

    /// Approximate number of resident entries.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

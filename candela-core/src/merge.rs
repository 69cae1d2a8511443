use std::collections::HashMap;

use candela_types::{CachedBar, CorrectionKind};

/// Total priority order over provider identifiers.
///
/// Listed providers rank by position (earlier wins); unlisted providers rank
/// after every listed one and are ordered among themselves by name, so the
/// order stays total and arrival-order independent.
#[derive(Debug, Clone, Default)]
pub struct ProviderRank {
    order: Vec<String>,
    ranks: HashMap<String, usize>,
}

impl ProviderRank {
    /// Build from an ordered priority list; duplicates keep their first
    /// position.
    #[must_use]
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values: Vec<String> = Vec::new();
        let mut ranks: HashMap<String, usize> = HashMap::new();
        for name in order {
            let name = name.into();
            if !ranks.contains_key(&name) {
                ranks.insert(name.clone(), values.len());
                values.push(name);
            }
        }
        Self {
            order: values,
            ranks,
        }
    }

    /// The configured order.
    #[must_use]
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Position of a provider in the configured list; unlisted providers
    /// share the sentinel rank `len`.
    #[must_use]
    pub fn rank(&self, provider: &str) -> usize {
        self.ranks.get(provider).copied().unwrap_or(self.order.len())
    }

    /// Whether provider `a` strictly outranks provider `b`.
    #[must_use]
    pub fn outranks(&self, a: &str, b: &str) -> bool {
        (self.rank(a), a) < (self.rank(b), b)
    }
}

/// Result of merging an incoming bar against the current winner for its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeDecision {
    /// The existing bar stays; nothing to emit.
    KeepExisting,
    /// The incoming bar wins and the change is observable.
    TakeIncoming(CorrectionKind),
}

fn unchanged(a: &CachedBar, b: &CachedBar) -> bool {
    a.bar == b.bar && a.provider == b.provider && a.revision == b.revision
}

/// Decide the winner between the stored bar (if any) and an incoming bar for
/// the same `(symbol, timeframe, timestamp)` key.
///
/// Rules, first match wins:
/// 1. no existing bar: incoming wins as `initial`;
/// 2. same provider, higher revision: incoming wins as `revision`;
/// 3. same provider, revision not newer: existing stays;
/// 4. different provider, incoming outranks: incoming wins as
///    `provider_override`;
/// 5. otherwise the existing bar stays.
///
/// A winning bar identical to the existing one (idempotent re-insert) is
/// reported as `KeepExisting` so no event fires. Given the same bag of
/// incoming bars in any order the final winner is identical: the winner is
/// the minimum under the total order (rank, provider, -revision).
#[must_use]
pub fn merge(
    existing: Option<&CachedBar>,
    incoming: &CachedBar,
    rank: &ProviderRank,
) -> MergeDecision {
    let Some(existing) = existing else {
        return MergeDecision::TakeIncoming(CorrectionKind::Initial);
    };
    if unchanged(existing, incoming) {
        return MergeDecision::KeepExisting;
    }
    if existing.provider == incoming.provider {
        if incoming.revision > existing.revision {
            return MergeDecision::TakeIncoming(CorrectionKind::Revision);
        }
        return MergeDecision::KeepExisting;
    }
    if rank.outranks(&incoming.provider, &existing.provider) {
        return MergeDecision::TakeIncoming(CorrectionKind::ProviderOverride);
    }
    MergeDecision::KeepExisting
}

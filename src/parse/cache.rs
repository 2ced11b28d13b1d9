//! The per-grammar lookahead cache.
//!
//! Decision functions are pure with respect to the grammar, so each decision
//! point is computed at most once and its function reused by every subsequent
//! parse over the same grammar. The cache is keyed by the decision point's
//! stable coordinates and owned by the grammar, so it can never outlive the
//! definition it was computed from.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;

use super::grammar::RuleId;
use super::lookahead::LookaheadFn;
use super::production::DecisionKind;

/// Stable identity of one decision point: rule, construct kind and the
/// construct's 1-based occurrence within the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecisionKey {
    pub rule: RuleId,
    pub kind: DecisionKind,
    pub occurrence: u16,
}

/// Lazily populated map from decision point to its compiled function.
#[derive(Debug, Default)]
pub struct LookaheadCache {
    entries: Mutex<FxHashMap<DecisionKey, Arc<LookaheadFn>>>,
}

impl LookaheadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of decision points computed so far.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Fetch the function for `key`, computing and storing it on first use.
    /// The lock is held across `compute`, so concurrent parsers agree on a
    /// single entry per decision point.
    pub fn get_or_compute(
        &self,
        key: DecisionKey,
        compute: impl FnOnce() -> Arc<LookaheadFn>,
    ) -> Arc<LookaheadFn> {
        let mut entries = self.entries.lock();
        Arc::clone(entries.entry(key).or_insert_with(|| {
            trace!(?key, "computing lookahead function");
            compute()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    fn key(occurrence: u16) -> DecisionKey {
        DecisionKey {
            rule: RuleId(0),
            kind: DecisionKind::Option,
            occurrence,
        }
    }

    fn enter_fn() -> Arc<LookaheadFn> {
        Arc::new(LookaheadFn::Enter {
            first: FxHashSet::default(),
        })
    }

    #[test]
    fn starts_empty() {
        let cache = LookaheadCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn computes_each_key_once() {
        let cache = LookaheadCache::new();
        let mut computed = 0;
        for _ in 0..3 {
            cache.get_or_compute(key(1), || {
                computed += 1;
                enter_fn()
            });
        }
        assert_eq!(computed, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_keys_get_distinct_entries() {
        let cache = LookaheadCache::new();
        cache.get_or_compute(key(1), enter_fn);
        cache.get_or_compute(key(2), enter_fn);
        let other = DecisionKey {
            rule: RuleId(1),
            kind: DecisionKind::Or,
            occurrence: 1,
        };
        cache.get_or_compute(other, enter_fn);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn returns_the_stored_function() {
        let cache = LookaheadCache::new();
        let first = cache.get_or_compute(key(1), enter_fn);
        let second = cache.get_or_compute(key(1), || {
            panic!("must not recompute");
        });
        assert!(Arc::ptr_eq(&first, &second));
    }
}

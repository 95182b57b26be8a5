//! Memoized state transitions
//!
//! Maps `(operation instance, input state)` to the state that operation
//! produced. Operations are keyed by identity: two distinct instances with
//! equal names and fields are different keys. The key holds a clone of the
//! `Arc`, so an allocation cannot be freed and reused by another operation
//! while its entries are cached.
//!
//! Input states compare with [`State::is_identical`], which keeps key
//! equality reflexive when a state contains NaN.
//!
//! Only successful executions are cached. Operations are assumed to be
//! deterministic; caching a nondeterministic operation changes results.

use crate::commute::Transition;
use dashmap::DashMap;
use ordersense_core::{operation_addr, OperationRef, Result, State};
use rustc_hash::FxHasher;
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{trace, warn};

#[derive(Debug, Clone)]
struct CacheKey {
    op: OperationRef,
    state: State,
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        operation_addr(&self.op) == operation_addr(&other.op) && self.state.is_identical(&other.state)
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        operation_addr(&self.op).hash(state);
        self.state.hash(state);
    }
}

/// Concurrent transition cache with an optional entry bound
///
/// When the bound is reached, new transitions are still computed but no
/// longer stored. Existing entries stay until [`clear`](Self::clear).
#[derive(Debug)]
pub(crate) struct TransitionCache {
    entries: DashMap<CacheKey, State, BuildHasherDefault<FxHasher>>,
    max_entries: Option<usize>,
    bound_reported: AtomicBool,
}

impl TransitionCache {
    pub(crate) fn new(max_entries: Option<usize>) -> Self {
        TransitionCache {
            entries: DashMap::with_hasher(BuildHasherDefault::default()),
            max_entries,
            bound_reported: AtomicBool::new(false),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    pub(crate) fn clear(&self) {
        self.entries.clear();
        self.bound_reported.store(false, Ordering::Relaxed);
    }

    /// Cached result of `op` on `state`, executing and storing it on a miss
    ///
    /// `hits` is bumped only when the result came from the cache. The
    /// operation runs outside any shard lock, so two threads missing on the
    /// same key may both execute it; the first stored result is kept.
    pub(crate) fn get_or_execute(
        &self,
        op: &OperationRef,
        state: &State,
        hits: &AtomicUsize,
    ) -> Result<State> {
        let key = CacheKey {
            op: op.clone(),
            state: state.clone(),
        };
        if let Some(cached) = self.entries.get(&key) {
            hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached.value().clone());
        }

        let produced = op.execute(state)?;
        if self.has_room() {
            trace!(target: "ordersense::cache", operation = op.name(), "Caching transition");
            self.entries.entry(key).or_insert_with(|| produced.clone());
        }
        Ok(produced)
    }

    fn has_room(&self) -> bool {
        match self.max_entries {
            Some(max) if self.entries.len() >= max => {
                if !self.bound_reported.swap(true, Ordering::Relaxed) {
                    warn!(
                        target: "ordersense::cache",
                        max_entries = max,
                        "Transition cache full; further transitions are not cached"
                    );
                }
                false
            }
            _ => true,
        }
    }
}

/// A [`Transition`] that routes executions through a [`TransitionCache`]
pub(crate) struct Cached<'a> {
    pub(crate) cache: &'a TransitionCache,
    pub(crate) hits: &'a AtomicUsize,
}

impl Transition for Cached<'_> {
    fn apply(&self, op: &OperationRef, state: &State) -> Result<State> {
        self.cache.get_or_execute(op, state, self.hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordersense_core::Operation;
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl Operation for Counting {
        fn name(&self) -> &str {
            "Counting"
        }

        fn is_order_sensitive(&self) -> bool {
            false
        }

        fn execute(&self, state: &State) -> Result<State> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let n = state.get_property("n", 0i64);
            state.with_property("n", n + 1)
        }
    }

    #[test]
    fn test_second_lookup_is_a_hit() {
        let cache = TransitionCache::new(None);
        let counting = Arc::new(Counting::default());
        let op: OperationRef = counting.clone();
        let hits = AtomicUsize::new(0);
        let s0 = State::new();

        let first = cache.get_or_execute(&op, &s0, &hits).unwrap();
        let second = cache.get_or_execute(&op, &s0, &hits).unwrap();

        assert_eq!(first, second);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_equal_states_share_an_entry() {
        let cache = TransitionCache::new(None);
        let op: OperationRef = Arc::new(Counting::default());
        let hits = AtomicUsize::new(0);
        let a = State::new().with_property("k", 1i64).unwrap();
        let b = State::new().with_property("k", 1i64).unwrap();

        cache.get_or_execute(&op, &a, &hits).unwrap();
        cache.get_or_execute(&op, &b, &hits).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_instances_are_distinct_keys() {
        let cache = TransitionCache::new(None);
        let a: OperationRef = Arc::new(Counting::default());
        let b: OperationRef = Arc::new(Counting::default());
        let hits = AtomicUsize::new(0);
        let s0 = State::new();

        cache.get_or_execute(&a, &s0, &hits).unwrap();
        cache.get_or_execute(&b, &s0, &hits).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_nan_state_key_hits() {
        let cache = TransitionCache::new(None);
        let op: OperationRef = Arc::new(Counting::default());
        let hits = AtomicUsize::new(0);
        let s = State::new().with_property("x", f64::NAN).unwrap();

        cache.get_or_execute(&op, &s, &hits).unwrap();
        cache.get_or_execute(&op, &s, &hits).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bound_stops_inserts_but_not_execution() {
        let cache = TransitionCache::new(Some(1));
        let op: OperationRef = Arc::new(Counting::default());
        let hits = AtomicUsize::new(0);
        let s0 = State::new();
        let s1 = s0.with_property("n", 5i64).unwrap();

        cache.get_or_execute(&op, &s0, &hits).unwrap();
        let out = cache.get_or_execute(&op, &s1, &hits).unwrap();
        assert_eq!(out.get_property("n", 0i64), 6);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}

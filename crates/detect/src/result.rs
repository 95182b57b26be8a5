//! Detection results and violation evidence

use ordersense_core::{Error, OperationRef, State, StateDifference};
use std::time::Duration;

/// Which detector produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionStrategy {
    /// Every unordered pair
    StateBased,
    /// Pairs selected by the dependency graph
    DependencyBased,
    /// Dependency pairs first, then the rest
    Hybrid,
    /// Every pair through the transition cache
    Optimized,
}

/// One of the two orderings of a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairOrder {
    /// `first` runs, then `second`
    FirstThenSecond,
    /// `second` runs, then `first`
    SecondThenFirst,
}

/// Why a pair was judged order-sensitive
#[derive(Debug, Clone)]
pub enum Violation {
    /// Both orderings succeeded and ended in different states
    Divergence {
        /// State after `first` then `second`
        forward: State,
        /// State after `second` then `first`
        backward: State,
        /// Keys that differ, forward on the left
        difference: StateDifference,
    },
    /// Exactly one ordering failed a precondition
    AsymmetricFailure {
        /// The ordering that failed
        failed_order: PairOrder,
        /// The precondition failure it raised
        error: Error,
        /// State produced by the ordering that succeeded
        surviving_state: State,
    },
}

impl Violation {
    /// Whether this is an asymmetric precondition failure
    pub fn is_asymmetric_failure(&self) -> bool {
        matches!(self, Violation::AsymmetricFailure { .. })
    }
}

/// A pair of operations that do not commute
///
/// `first_index < second_index` always; both index the operation slice the
/// detector was given.
#[derive(Debug, Clone)]
pub struct OrderSensitivePair {
    /// Operation at the lower index
    pub first: OperationRef,
    /// Operation at the higher index
    pub second: OperationRef,
    /// Index of `first`
    pub first_index: usize,
    /// Index of `second`
    pub second_index: usize,
    /// Evidence
    pub violation: Violation,
}

impl OrderSensitivePair {
    /// `(first_index, second_index)`
    pub fn indices(&self) -> (usize, usize) {
        (self.first_index, self.second_index)
    }
}

/// Verdict, evidence and statistics of one detection call
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Whether any pair failed to commute
    pub is_order_sensitive: bool,
    /// Every violating pair found
    pub order_sensitive_pairs: Vec<OrderSensitivePair>,
    /// Pairs actually commuted
    pub pairs_tested: usize,
    /// Transitions served from the cache (optimized detector only)
    pub cache_hits: usize,
    /// Wall-clock time spent
    pub detection_time: Duration,
    /// Whether scanning stopped before every candidate pair ran
    pub terminated_early: bool,
    /// Detector that produced this result
    pub strategy: DetectionStrategy,
}

impl DetectionResult {
    /// Result for fewer than two operations
    pub(crate) fn insensitive(strategy: DetectionStrategy) -> Self {
        DetectionResult {
            is_order_sensitive: false,
            order_sensitive_pairs: Vec::new(),
            pairs_tested: 0,
            cache_hits: 0,
            detection_time: Duration::ZERO,
            terminated_early: false,
            strategy,
        }
    }

    /// Index pairs of every violation, in the order found
    pub fn pair_indices(&self) -> Vec<(usize, usize)> {
        self.order_sensitive_pairs
            .iter()
            .map(OrderSensitivePair::indices)
            .collect()
    }

    /// Whether operations `i` and `j` were reported, in either order
    pub fn contains_pair(&self, i: usize, j: usize) -> bool {
        let key = (i.min(j), i.max(j));
        self.order_sensitive_pairs.iter().any(|p| p.indices() == key)
    }

    /// Number of violating pairs
    pub fn violation_count(&self) -> usize {
        self.order_sensitive_pairs.len()
    }
}

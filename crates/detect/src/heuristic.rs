//! Heuristic pairwise detectors
//!
//! Exhaustive permutation testing costs O(n!·T). These detectors only
//! commute pairs:
//! - State-based: every unordered pair, O(n²·T)
//! - Dependency-based: pairs selected by the [`DependencyGraph`], O(d·T)
//! - Hybrid: dependency pairs first; if none violates, the remaining pairs
//!
//! Pairs run in lexicographic `(i, j)` order, so results are deterministic
//! for a fixed input. None of these detectors terminates early.

use crate::commute::{commute, Direct, PairOutcome};
use crate::config::FailurePolicy;
use crate::graph::DependencyGraph;
use crate::result::{DetectionResult, DetectionStrategy, OrderSensitivePair};
use ordersense_core::{OperationRef, Result, State};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info};

/// Pairwise detectors with a chosen [`FailurePolicy`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeuristicDetector {
    policy: FailurePolicy,
}

impl HeuristicDetector {
    /// Detectors applying `policy` to one-sided precondition failures
    pub fn new(policy: FailurePolicy) -> Self {
        HeuristicDetector { policy }
    }

    /// The configured failure policy
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Commute every unordered pair `(i, j)`, `i < j`
    pub fn state_based(&self, operations: &[OperationRef], initial: &State) -> Result<DetectionResult> {
        if operations.len() < 2 {
            return Ok(DetectionResult::insensitive(DetectionStrategy::StateBased));
        }
        let start = Instant::now();
        let mut found = Vec::new();
        let tested = self.test_pairs(operations, initial, all_pairs(operations.len()), &mut found)?;
        Ok(finish(DetectionStrategy::StateBased, found, tested, start, false))
    }

    /// Commute only the dependency graph's candidate pairs
    pub fn dependency_based(
        &self,
        operations: &[OperationRef],
        initial: &State,
    ) -> Result<DetectionResult> {
        if operations.len() < 2 {
            return Ok(DetectionResult::insensitive(DetectionStrategy::DependencyBased));
        }
        let start = Instant::now();
        let candidates = DependencyGraph::build(operations).candidate_pairs();
        let mut found = Vec::new();
        let tested = self.test_pairs(operations, initial, candidates, &mut found)?;
        Ok(finish(DetectionStrategy::DependencyBased, found, tested, start, false))
    }

    /// Dependency pairs first, then every pair the graph left out
    ///
    /// Returns as soon as the dependency pass finds a violation. Otherwise
    /// every pair has been tested exactly once by the time it returns.
    pub fn hybrid(&self, operations: &[OperationRef], initial: &State) -> Result<DetectionResult> {
        if operations.len() < 2 {
            return Ok(DetectionResult::insensitive(DetectionStrategy::Hybrid));
        }
        let start = Instant::now();
        let candidates = DependencyGraph::build(operations).candidate_pairs();
        let mut found = Vec::new();
        let mut tested = self.test_pairs(operations, initial, candidates.iter().copied(), &mut found)?;

        if !found.is_empty() {
            let skipped = total_pairs(operations.len()) > tested;
            return Ok(finish(DetectionStrategy::Hybrid, found, tested, start, skipped));
        }

        let covered: HashSet<(usize, usize)> = candidates.into_iter().collect();
        let remaining = all_pairs(operations.len()).filter(|pair| !covered.contains(pair));
        tested += self.test_pairs(operations, initial, remaining, &mut found)?;
        Ok(finish(DetectionStrategy::Hybrid, found, tested, start, false))
    }

    fn test_pairs(
        &self,
        operations: &[OperationRef],
        initial: &State,
        pairs: impl IntoIterator<Item = (usize, usize)>,
        found: &mut Vec<OrderSensitivePair>,
    ) -> Result<usize> {
        let mut tested = 0;
        for (i, j) in pairs {
            tested += 1;
            let (a, b) = (&operations[i], &operations[j]);
            if let PairOutcome::Violates(violation) = commute(&Direct, a, b, initial, self.policy)? {
                debug!(
                    target: "ordersense::detect",
                    first = a.name(),
                    second = b.name(),
                    i,
                    j,
                    "Order-sensitive pair"
                );
                found.push(OrderSensitivePair {
                    first: a.clone(),
                    second: b.clone(),
                    first_index: i,
                    second_index: j,
                    violation,
                });
            }
        }
        Ok(tested)
    }
}

/// [`HeuristicDetector::state_based`] with the default failure policy
pub fn detect_state_based(operations: &[OperationRef], initial: &State) -> Result<DetectionResult> {
    HeuristicDetector::default().state_based(operations, initial)
}

/// [`HeuristicDetector::dependency_based`] with the default failure policy
pub fn detect_dependency_based(
    operations: &[OperationRef],
    initial: &State,
) -> Result<DetectionResult> {
    HeuristicDetector::default().dependency_based(operations, initial)
}

/// [`HeuristicDetector::hybrid`] with the default failure policy
pub fn detect_hybrid(operations: &[OperationRef], initial: &State) -> Result<DetectionResult> {
    HeuristicDetector::default().hybrid(operations, initial)
}

/// Every `(i, j)` with `i < j < n`, in lexicographic order
pub(crate) fn all_pairs(n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n).flat_map(move |i| (i + 1..n).map(move |j| (i, j)))
}

pub(crate) fn total_pairs(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

fn finish(
    strategy: DetectionStrategy,
    found: Vec<OrderSensitivePair>,
    pairs_tested: usize,
    start: Instant,
    terminated_early: bool,
) -> DetectionResult {
    let detection_time = start.elapsed();
    info!(
        target: "ordersense::detect",
        ?strategy,
        pairs_tested,
        violations = found.len(),
        elapsed_us = detection_time.as_micros() as u64,
        "Detection complete"
    );
    DetectionResult {
        is_order_sensitive: !found.is_empty(),
        order_sensitive_pairs: found,
        pairs_tested,
        cache_hits: 0,
        detection_time,
        terminated_early,
        strategy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_pairs_order() {
        let pairs: Vec<_> = all_pairs(4).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
        assert_eq!(all_pairs(1).count(), 0);
        assert_eq!(all_pairs(0).count(), 0);
    }

    #[test]
    fn test_total_pairs() {
        assert_eq!(total_pairs(0), 0);
        assert_eq!(total_pairs(1), 0);
        assert_eq!(total_pairs(2), 1);
        assert_eq!(total_pairs(5), 10);
    }

    #[test]
    fn test_fewer_than_two_operations() {
        let s0 = State::new();
        for result in [
            detect_state_based(&[], &s0).unwrap(),
            detect_dependency_based(&[], &s0).unwrap(),
            detect_hybrid(&[], &s0).unwrap(),
        ] {
            assert!(!result.is_order_sensitive);
            assert_eq!(result.pairs_tested, 0);
        }
    }
}

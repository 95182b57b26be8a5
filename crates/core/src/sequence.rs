//! Ordered operation sequences
//!
//! This module provides:
//! - ExecutionOrder: positional bookkeeping for a sequence
//! - OperationSequence: a validated, ordered list of operations that folds
//!   over an initial state
//!
//! The execution order is diagnostic only. Detectors never consult it; they
//! commute operations directly.

use crate::error::{Error, Result};
use crate::operation::{Operation, OperationRef};
use crate::state::State;
use crate::transition::StateTransition;
use std::collections::{BTreeMap, HashSet};
use tracing::trace;

// ============================================================================
// ExecutionOrder
// ============================================================================

/// Sequence numbers and name lookups for an operation list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOrder {
    sequence_numbers: Vec<i64>,
    positions: BTreeMap<String, i64>,
}

impl ExecutionOrder {
    /// Build an order from explicit sequence numbers
    ///
    /// Names are synthesized as `Operation_{i}` and map to the `i`th
    /// sequence number.
    pub fn new(sequence_numbers: Vec<i64>) -> Self {
        let positions = sequence_numbers
            .iter()
            .enumerate()
            .map(|(i, &n)| (format!("Operation_{}", i), n))
            .collect();
        ExecutionOrder {
            sequence_numbers,
            positions,
        }
    }

    /// Build the natural `0..n` order for `operations`
    ///
    /// When two operations share a name the later position wins the lookup.
    pub fn for_operations(operations: &[OperationRef]) -> Self {
        let mut positions = BTreeMap::new();
        for (i, op) in operations.iter().enumerate() {
            positions.insert(op.name().to_string(), i as i64);
        }
        ExecutionOrder {
            sequence_numbers: (0..operations.len() as i64).collect(),
            positions,
        }
    }

    /// Raw sequence numbers
    pub fn sequence_numbers(&self) -> &[i64] {
        &self.sequence_numbers
    }

    /// Number of positions
    pub fn len(&self) -> usize {
        self.sequence_numbers.len()
    }

    /// Whether the order has no positions
    pub fn is_empty(&self) -> bool {
        self.sequence_numbers.is_empty()
    }

    /// All sequence numbers are non-negative and unique
    pub fn is_valid(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.sequence_numbers.len());
        self.sequence_numbers.iter().all(|&n| n >= 0 && seen.insert(n))
    }

    /// Whether an operation placed at `position` breaks the order
    ///
    /// Only bounds are checked.
    pub fn violates_constraints(&self, _operation: &dyn Operation, position: usize) -> bool {
        position >= self.sequence_numbers.len()
    }

    /// Sequence number recorded for `name`
    pub fn position(&self, name: &str) -> Option<i64> {
        self.positions.get(name).copied()
    }
}

// ============================================================================
// OperationSequence
// ============================================================================

/// An ordered list of operations
#[derive(Debug, Clone)]
pub struct OperationSequence {
    operations: Vec<OperationRef>,
    order: ExecutionOrder,
}

impl OperationSequence {
    /// Create a sequence with the natural execution order
    pub fn new(operations: Vec<OperationRef>) -> Self {
        let order = ExecutionOrder::for_operations(&operations);
        OperationSequence { operations, order }
    }

    /// Create a sequence with an explicit execution order
    pub fn with_order(operations: Vec<OperationRef>, order: ExecutionOrder) -> Self {
        OperationSequence { operations, order }
    }

    /// The operations, in execution order
    pub fn operations(&self) -> &[OperationRef] {
        &self.operations
    }

    /// Positional bookkeeping
    pub fn order(&self) -> &ExecutionOrder {
        &self.order
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the sequence has no operations
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Check the sequence without executing it
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Fold the operations left-to-right over `initial`
    ///
    /// # Errors
    ///
    /// - `InvalidSequence` if the sequence fails validation
    /// - any error raised by an operation, unchanged
    pub fn execute(&self, initial: &State) -> Result<State> {
        self.validate()?;
        let mut current = initial.clone();
        for op in &self.operations {
            trace!(target: "ordersense::sequence", operation = op.name(), "Executing operation");
            current = op.execute(&current)?;
        }
        Ok(current)
    }

    /// Execute and keep the initial state alongside the result
    pub fn execute_traced(&self, initial: &State) -> Result<StateTransition> {
        let final_state = self.execute(initial)?;
        Ok(StateTransition {
            initial_state: initial.clone(),
            final_state,
            operations: self.operations.clone(),
            order: self.order.clone(),
        })
    }

    /// A new sequence holding `reordered` with its natural order
    pub fn with_different_order(&self, reordered: Vec<OperationRef>) -> OperationSequence {
        OperationSequence::new(reordered)
    }

    fn validate(&self) -> Result<()> {
        if self.operations.is_empty() {
            return Err(Error::InvalidSequence("sequence is empty".to_string()));
        }
        if !self.order.is_valid() {
            return Err(Error::InvalidSequence(
                "execution order has negative or duplicate sequence numbers".to_string(),
            ));
        }
        for (i, op) in self.operations.iter().enumerate() {
            if self.order.violates_constraints(op.as_ref(), i) {
                return Err(Error::InvalidSequence(format!(
                    "operation {} at position {} is outside the execution order",
                    op.name(),
                    i
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Append(&'static str);

    impl Operation for Append {
        fn name(&self) -> &str {
            self.0
        }

        fn is_order_sensitive(&self) -> bool {
            true
        }

        fn execute(&self, state: &State) -> Result<State> {
            let log = state.get_property("log", String::new());
            state.with_property("log", format!("{}{}", log, self.0))
        }
    }

    fn ops(names: &[&'static str]) -> Vec<OperationRef> {
        names
            .iter()
            .map(|n| Arc::new(Append(*n)) as OperationRef)
            .collect()
    }

    #[test]
    fn test_execute_folds_left_to_right() {
        let seq = OperationSequence::new(ops(&["a", "b", "c"]));
        let out = seq.execute(&State::new()).unwrap();
        assert_eq!(out.get_property("log", String::new()), "abc");
    }

    #[test]
    fn test_empty_sequence_is_invalid() {
        let seq = OperationSequence::new(Vec::new());
        assert!(!seq.is_valid());
        assert!(matches!(
            seq.execute(&State::new()),
            Err(Error::InvalidSequence(_))
        ));
    }

    #[test]
    fn test_duplicate_sequence_numbers_are_invalid() {
        let order = ExecutionOrder::new(vec![0, 0]);
        assert!(!order.is_valid());
        let seq = OperationSequence::with_order(ops(&["a", "b"]), order);
        assert!(!seq.is_valid());
    }

    #[test]
    fn test_negative_sequence_numbers_are_invalid() {
        assert!(!ExecutionOrder::new(vec![0, -1]).is_valid());
        assert!(ExecutionOrder::new(vec![3, 1, 2]).is_valid());
    }

    #[test]
    fn test_order_shorter_than_operations_is_invalid() {
        let seq = OperationSequence::with_order(ops(&["a", "b"]), ExecutionOrder::new(vec![0]));
        assert!(!seq.is_valid());
    }

    #[test]
    fn test_position_lookup() {
        let order = ExecutionOrder::for_operations(&ops(&["a", "b", "a"]));
        assert_eq!(order.position("a"), Some(2));
        assert_eq!(order.position("b"), Some(1));
        assert_eq!(order.position("z"), None);

        let synthetic = ExecutionOrder::new(vec![5, 6]);
        assert_eq!(synthetic.position("Operation_0"), Some(5));
        assert_eq!(synthetic.position("Operation_1"), Some(6));
        assert_eq!(synthetic.position("Operation_2"), None);
    }

    #[test]
    fn test_with_different_order() {
        let seq = OperationSequence::new(ops(&["a", "b"]));
        let reversed: Vec<_> = seq.operations().iter().rev().cloned().collect();
        let other = seq.with_different_order(reversed);
        let out = other.execute(&State::new()).unwrap();
        assert_eq!(out.get_property("log", String::new()), "ba");
    }

    #[test]
    fn test_execute_traced_keeps_initial_state() {
        let initial = State::new().with_property("log", ">").unwrap();
        let seq = OperationSequence::new(ops(&["x"]));
        let t = seq.execute_traced(&initial).unwrap();
        assert_eq!(t.initial_state, initial);
        assert_eq!(t.final_state.get_property("log", String::new()), ">x");
        assert_eq!(t.operations.len(), 1);
    }
}

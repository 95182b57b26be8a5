//! Recorded state transitions

use crate::comparer::{StateComparer, StateDifference};
use crate::operation::OperationRef;
use crate::sequence::ExecutionOrder;
use crate::state::State;

/// The result of running a sequence: where it started, where it ended,
/// and what ran in between
#[derive(Debug, Clone)]
pub struct StateTransition {
    /// State the sequence started from
    pub initial_state: State,
    /// State the sequence produced
    pub final_state: State,
    /// Operations that ran, in order
    pub operations: Vec<OperationRef>,
    /// Execution order of the sequence
    pub order: ExecutionOrder,
}

impl StateTransition {
    /// Whether both transitions ended in structurally equal states
    pub fn produces_same_state(&self, other: &StateTransition) -> bool {
        StateComparer::are_equal(&self.final_state, &other.final_state)
    }

    /// How the final states differ
    pub fn difference(&self, other: &StateTransition) -> StateDifference {
        StateComparer::get_difference(&self.final_state, &other.final_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::operation::Operation;
    use crate::sequence::OperationSequence;
    use crate::value::Value;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Set(&'static str, i64);

    impl Operation for Set {
        fn name(&self) -> &str {
            self.0
        }

        fn is_order_sensitive(&self) -> bool {
            true
        }

        fn execute(&self, state: &State) -> Result<State> {
            state.with_property("v", self.1)
        }
    }

    #[test]
    fn test_transitions_compare_final_states() {
        let a: Vec<OperationRef> = vec![Arc::new(Set("one", 1)), Arc::new(Set("two", 2))];
        let b: Vec<OperationRef> = a.iter().rev().cloned().collect();

        let s0 = State::new();
        let forward = OperationSequence::new(a).execute_traced(&s0).unwrap();
        let backward = OperationSequence::new(b).execute_traced(&s0).unwrap();

        assert!(!forward.produces_same_state(&backward));
        let diff = forward.difference(&backward);
        assert_eq!(
            diff.property_differences["v"],
            (Some(Value::Int(2)), Some(Value::Int(1)))
        );
        assert!(forward.produces_same_state(&forward.clone()));
    }
}

//! A minimal stateful system under test

use crate::error::Result;
use crate::operation::Operation;
use crate::sequence::OperationSequence;
use crate::state::State;

/// Owns a current state and advances it one operation or sequence at a time
///
/// A failed execution leaves the current state unchanged.
#[derive(Debug, Clone, Default)]
pub struct StatefulSystem {
    current: State,
}

impl StatefulSystem {
    /// Start from `initial`
    pub fn new(initial: State) -> Self {
        StatefulSystem { current: initial }
    }

    /// The current state
    pub fn current_state(&self) -> &State {
        &self.current
    }

    /// Apply one operation
    pub fn execute(&mut self, operation: &dyn Operation) -> Result<&State> {
        self.current = operation.execute(&self.current)?;
        Ok(&self.current)
    }

    /// Apply a whole sequence
    ///
    /// Fails with `InvalidSequence` if the sequence is invalid.
    pub fn execute_sequence(&mut self, sequence: &OperationSequence) -> Result<&State> {
        self.current = sequence.execute(&self.current)?;
        Ok(&self.current)
    }

    /// Replace the current state
    pub fn reset(&mut self, initial: State) {
        self.current = initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::operation::OperationRef;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Withdraw(i64);

    impl Operation for Withdraw {
        fn name(&self) -> &str {
            "Withdraw"
        }

        fn is_order_sensitive(&self) -> bool {
            true
        }

        fn execute(&self, state: &State) -> Result<State> {
            let balance = state.get_property("balance", 0i64);
            if balance < self.0 {
                return Err(Error::precondition(self.name(), "insufficient balance"));
            }
            state.with_property("balance", balance - self.0)
        }
    }

    #[test]
    fn test_execute_advances_state() {
        let mut system = StatefulSystem::new(State::new().with_property("balance", 100i64).unwrap());
        system.execute(&Withdraw(30)).unwrap();
        assert_eq!(system.current_state().get_property("balance", 0i64), 70);
    }

    #[test]
    fn test_failed_execute_keeps_state() {
        let mut system = StatefulSystem::new(State::new().with_property("balance", 10i64).unwrap());
        assert!(system.execute(&Withdraw(30)).is_err());
        assert_eq!(system.current_state().get_property("balance", 0i64), 10);
    }

    #[test]
    fn test_invalid_sequence_is_rejected() {
        let mut system = StatefulSystem::default();
        let empty = OperationSequence::new(Vec::new());
        assert!(matches!(
            system.execute_sequence(&empty),
            Err(Error::InvalidSequence(_))
        ));
    }

    #[test]
    fn test_execute_sequence_and_reset() {
        let mut system = StatefulSystem::new(State::new().with_property("balance", 100i64).unwrap());
        let ops: Vec<OperationRef> = vec![Arc::new(Withdraw(10)), Arc::new(Withdraw(20))];
        system.execute_sequence(&OperationSequence::new(ops)).unwrap();
        assert_eq!(system.current_state().get_property("balance", 0i64), 70);

        system.reset(State::new());
        assert!(system.current_state().is_empty());
    }
}

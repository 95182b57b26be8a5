//! Ordering constraints and quick order-sensitivity checks
//!
//! Constraints name operations by [`Operation::name`]. Two kinds of rule
//! are supported:
//! - Position bounds: `min_position`, `max_position` (inclusive)
//! - Precedence: `must_precede` / `must_follow` other named operations
//!
//! Breaking a rule is an error. Referencing an operation that is not in
//! the sequence is only a warning, since the rule cannot be checked.
//!
//! [`Operation::name`]: crate::Operation::name

use crate::comparer::StateComparer;
use crate::error::Result;
use crate::operation::OperationRef;
use crate::sequence::OperationSequence;
use crate::state::State;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A rule on where a named operation may appear
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingConstraint {
    /// Operation the rule applies to
    pub operation_name: String,
    /// Earliest allowed position
    pub min_position: Option<usize>,
    /// Latest allowed position
    pub max_position: Option<usize>,
    /// Operations that must come after this one
    pub must_precede: Vec<String>,
    /// Operations that must come before this one
    pub must_follow: Vec<String>,
}

impl OrderingConstraint {
    /// An empty rule for `operation_name`
    pub fn for_operation(operation_name: impl Into<String>) -> Self {
        OrderingConstraint {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }
}

/// Outcome of checking a sequence against constraints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceValidation {
    /// Broken rules
    pub errors: Vec<String>,
    /// Rules that could not be checked
    pub warnings: Vec<String>,
}

impl SequenceValidation {
    /// Whether no rule was broken
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validation utilities for operation ordering
pub struct OrderValidator;

impl OrderValidator {
    /// Check `sequence` against `constraints`
    ///
    /// With several constraints for the same name, the last one applies.
    pub fn check_sequence(
        sequence: &OperationSequence,
        constraints: &[OrderingConstraint],
    ) -> SequenceValidation {
        let mut report = SequenceValidation::default();
        let by_name: HashMap<&str, &OrderingConstraint> = constraints
            .iter()
            .map(|c| (c.operation_name.as_str(), c))
            .collect();
        let ops = sequence.operations();
        let first_index = |name: &str| ops.iter().position(|op| op.name() == name);

        for (i, op) in ops.iter().enumerate() {
            let Some(constraint) = by_name.get(op.name()) else {
                continue;
            };
            let name = op.name();

            if let Some(min) = constraint.min_position {
                if i < min {
                    report.errors.push(format!(
                        "Operation {} must be at position >= {}, but is at {}",
                        name, min, i
                    ));
                }
            }
            if let Some(max) = constraint.max_position {
                if i > max {
                    report.errors.push(format!(
                        "Operation {} must be at position <= {}, but is at {}",
                        name, max, i
                    ));
                }
            }

            for later in &constraint.must_precede {
                match first_index(later) {
                    None => report
                        .warnings
                        .push(format!("Operation {} not found in sequence", later)),
                    Some(j) if i >= j => report.errors.push(format!(
                        "Operation {} must precede {}, but {} is at position {} and {} is at {}",
                        name, later, name, i, later, j
                    )),
                    Some(_) => {}
                }
            }

            for earlier in &constraint.must_follow {
                match first_index(earlier) {
                    None => report
                        .warnings
                        .push(format!("Operation {} not found in sequence", earlier)),
                    Some(j) if j >= i => report.errors.push(format!(
                        "Operation {} must follow {}, but {} is at position {} and {} is at {}",
                        name, earlier, name, i, earlier, j
                    )),
                    Some(_) => {}
                }
            }
        }

        report
    }

    /// Cheap order-sensitivity check
    ///
    /// Fewer than two operations are never sensitive. If any operation is
    /// flagged order-sensitive the set is. Otherwise the forward and reversed
    /// sequences are executed and their final states compared. This samples a
    /// single permutation and can miss sensitivity the detectors would find.
    pub fn is_order_sensitive(operations: &[OperationRef], initial: &State) -> Result<bool> {
        if operations.len() < 2 {
            return Ok(false);
        }
        if operations.iter().any(|op| op.is_order_sensitive()) {
            return Ok(true);
        }

        let forward = OperationSequence::new(operations.to_vec()).execute(initial)?;
        let reversed: Vec<OperationRef> = operations.iter().rev().cloned().collect();
        let backward = OperationSequence::new(reversed).execute(initial)?;
        Ok(!StateComparer::are_equal(&forward, &backward))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Step {
        name: &'static str,
        sensitive: bool,
    }

    impl Operation for Step {
        fn name(&self) -> &str {
            self.name
        }

        fn is_order_sensitive(&self) -> bool {
            self.sensitive
        }

        fn execute(&self, state: &State) -> Result<State> {
            let n = state.get_property("count", 0i64);
            state.with_property("count", n + 1)
        }
    }

    fn seq(names: &[&'static str]) -> OperationSequence {
        OperationSequence::new(
            names
                .iter()
                .map(|n| {
                    Arc::new(Step {
                        name: *n,
                        sensitive: false,
                    }) as OperationRef
                })
                .collect(),
        )
    }

    #[test]
    fn test_no_constraints_is_valid() {
        let report = OrderValidator::check_sequence(&seq(&["a", "b"]), &[]);
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_position_bounds() {
        let mut c = OrderingConstraint::for_operation("b");
        c.max_position = Some(0);
        let report = OrderValidator::check_sequence(&seq(&["a", "b"]), &[c]);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("position <= 0"));

        let mut c = OrderingConstraint::for_operation("a");
        c.min_position = Some(1);
        let report = OrderValidator::check_sequence(&seq(&["a", "b"]), &[c]);
        assert!(!report.is_valid());
    }

    #[test]
    fn test_must_precede() {
        let mut c = OrderingConstraint::for_operation("validate");
        c.must_precede = vec!["pay".to_string()];

        let ok = OrderValidator::check_sequence(&seq(&["validate", "pay"]), &[c.clone()]);
        assert!(ok.is_valid());

        let bad = OrderValidator::check_sequence(&seq(&["pay", "validate"]), &[c]);
        assert!(!bad.is_valid());
        assert!(bad.errors[0].contains("must precede pay"));
    }

    #[test]
    fn test_must_follow() {
        let mut c = OrderingConstraint::for_operation("notify");
        c.must_follow = vec!["pay".to_string()];

        assert!(OrderValidator::check_sequence(&seq(&["pay", "notify"]), &[c.clone()]).is_valid());
        assert!(!OrderValidator::check_sequence(&seq(&["notify", "pay"]), &[c]).is_valid());
    }

    #[test]
    fn test_missing_reference_is_warning() {
        let mut c = OrderingConstraint::for_operation("a");
        c.must_precede = vec!["ghost".to_string()];
        let report = OrderValidator::check_sequence(&seq(&["a"]), &[c]);
        assert!(report.is_valid());
        assert_eq!(report.warnings, vec!["Operation ghost not found in sequence"]);
    }

    #[test]
    fn test_constraint_deserializes_with_defaults() {
        let c: OrderingConstraint =
            serde_json::from_str(r#"{"operation_name": "pay", "must_follow": ["validate"]}"#)
                .unwrap();
        assert_eq!(c.operation_name, "pay");
        assert_eq!(c.min_position, None);
        assert_eq!(c.must_follow, vec!["validate"]);
    }

    #[test]
    fn test_is_order_sensitive_quick_check() {
        let s0 = State::new();
        let plain = seq(&["a", "b"]);
        assert!(!OrderValidator::is_order_sensitive(plain.operations(), &s0).unwrap());
        assert!(!OrderValidator::is_order_sensitive(&plain.operations()[..1], &s0).unwrap());

        let flagged: Vec<OperationRef> = vec![
            Arc::new(Step {
                name: "a",
                sensitive: true,
            }),
            Arc::new(Step {
                name: "b",
                sensitive: false,
            }),
        ];
        assert!(OrderValidator::is_order_sensitive(&flagged, &s0).unwrap());
    }
}

//! Structural comparison of states
//!
//! Equality looks at the property map only: same key set, and for every key
//! values of the same variant that compare equal. Timestamps are ignored.

use crate::state::State;
use crate::value::Value;
use std::collections::BTreeMap;

/// Pseudo-key reported when one side of a comparison has no state at all
pub const WHOLE_STATE_KEY: &str = "State";

/// Keys that differ between two states, with the value found on each side
///
/// `None` marks a key missing on that side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDifference {
    /// Differing keys in key order
    pub different_properties: Vec<String>,
    /// Per differing key: (left value, right value)
    pub property_differences: BTreeMap<String, (Option<Value>, Option<Value>)>,
}

impl StateDifference {
    /// Whether anything differs
    pub fn has_differences(&self) -> bool {
        !self.different_properties.is_empty() || !self.property_differences.is_empty()
    }

    /// Number of differing keys
    pub fn len(&self) -> usize {
        self.different_properties.len()
    }

    /// Whether nothing differs
    pub fn is_empty(&self) -> bool {
        !self.has_differences()
    }
}

/// Comparison utilities for [`State`]
pub struct StateComparer;

impl StateComparer {
    /// Structural equality
    pub fn are_equal(a: &State, b: &State) -> bool {
        a == b
    }

    /// Structural equality where either side may be absent
    ///
    /// Two absent states are equal; one absent state equals nothing.
    pub fn are_equal_opt(a: Option<&State>, b: Option<&State>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => Self::are_equal(a, b),
            _ => false,
        }
    }

    /// Every key whose presence or value differs between `a` and `b`
    pub fn get_difference(a: &State, b: &State) -> StateDifference {
        let mut diff = StateDifference::default();
        let left = a.properties();
        let right = b.properties();

        let mut keys: Vec<&String> = left.keys().chain(right.keys()).collect();
        keys.sort();
        keys.dedup();

        for key in keys {
            let l = left.get(key);
            let r = right.get(key);
            let same = matches!((l, r), (Some(x), Some(y)) if x == y);
            if !same {
                diff.different_properties.push(key.clone());
                diff.property_differences
                    .insert(key.clone(), (l.cloned(), r.cloned()));
            }
        }
        diff
    }

    /// Difference where either side may be absent
    ///
    /// One absent side reports the whole state as a single differing
    /// [`WHOLE_STATE_KEY`] entry holding the present side as a map.
    pub fn get_difference_opt(a: Option<&State>, b: Option<&State>) -> StateDifference {
        match (a, b) {
            (None, None) => StateDifference::default(),
            (Some(a), Some(b)) => Self::get_difference(a, b),
            (a, b) => {
                let as_value = |s: Option<&State>| s.map(|s| Value::Map(s.properties().clone()));
                let mut diff = StateDifference::default();
                diff.different_properties.push(WHOLE_STATE_KEY.to_string());
                diff.property_differences
                    .insert(WHOLE_STATE_KEY.to_string(), (as_value(a), as_value(b)));
                diff
            }
        }
    }
}

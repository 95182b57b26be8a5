//! The operation capability set
//!
//! An [`Operation`] transforms one [`State`] into the next and declares,
//! up front, whether its author considers it order-sensitive. The flag is
//! a classification only; detectors verify it by actually commuting
//! operations, and the dependency graph uses it to prune candidates.
//!
//! ## Contract
//!
//! `execute` must be referentially transparent: the same input state always
//! yields the same output (or the same error). The optimized detector caches
//! transitions on that assumption.
//!
//! `execute` returns `Err(Error::PreconditionFailure { .. })` only for a
//! genuine precondition failure, such as a withdrawal exceeding the balance.
//!
//! A "state-dependent" operation is an order-sensitive one whose effect
//! depends on a value it reads from the current state. That is a
//! documentation convention, not a separate type.

use crate::error::Result;
use crate::state::State;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Descriptive information about an operation
///
/// Informational only; no detection algorithm reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationMetadata {
    /// Human-readable description
    pub description: String,
    /// Named parameters the operation was built with
    pub parameters: BTreeMap<String, Value>,
}

impl OperationMetadata {
    /// Metadata with a description and no parameters
    pub fn described(description: impl Into<String>) -> Self {
        OperationMetadata {
            description: description.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Add a parameter
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

/// A named, polymorphic unit of state transformation
pub trait Operation: Send + Sync + Debug {
    /// Stable identity string
    ///
    /// Used for constraint and position lookups. Not guaranteed unique across
    /// instances.
    fn name(&self) -> &str;

    /// Author-declared order sensitivity
    fn is_order_sensitive(&self) -> bool;

    /// Produce the next state from `state`
    fn execute(&self, state: &State) -> Result<State>;

    /// Descriptive metadata
    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::described(format!("Operation: {}", self.name()))
    }
}

/// Shared handle to an operation
///
/// Detectors take and return operations through this handle. The `Arc`
/// allocation is the operation's identity for caching purposes.
pub type OperationRef = Arc<dyn Operation>;

/// Address of the operation behind `op`, ignoring the vtable
pub fn operation_addr(op: &OperationRef) -> usize {
    Arc::as_ptr(op) as *const () as usize
}

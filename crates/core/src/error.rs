//! Error types for order-sensitivity detection
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//! Every error is surfaced synchronously to the immediate caller; nothing in
//! the engine retries or suppresses.

use thiserror::Error;

/// Result type alias for ordersense operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the detection engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A required argument was absent or out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A state property key was empty
    #[error("Invalid property key: {0:?}")]
    InvalidKey(String),

    /// An operation sequence failed its validity check
    #[error("Invalid sequence: {0}")]
    InvalidSequence(String),

    /// An operation rejected the state it was given
    #[error("Precondition failed in {operation}: {reason}")]
    PreconditionFailure {
        /// Name of the rejecting operation
        operation: String,
        /// Why the state was rejected
        reason: String,
    },

    /// Detector configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// A workflow has no step with this name
    #[error("Step {0} not found")]
    StepNotFound(String),

    /// A workflow step ran before one of its dependencies completed
    #[error("Step {step} requires {dependency} to be completed first")]
    UnmetDependency {
        /// Step that was asked to run
        step: String,
        /// Dependency still incomplete
        dependency: String,
    },

    /// Workflow dependencies form a cycle through this step
    #[error("Circular dependency detected involving {0}")]
    CircularDependency(String),
}

impl Error {
    /// Build a `PreconditionFailure` for `operation`
    pub fn precondition(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::PreconditionFailure {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is an operation-level precondition failure
    pub fn is_precondition_failure(&self) -> bool {
        matches!(self, Error::PreconditionFailure { .. })
    }
}

//! Core types for ordersense
//!
//! This crate defines the execution model the detectors run on:
//! - Value: tagged union for property values
//! - State: immutable, structurally-comparable key/value snapshot
//! - Operation: capability set every state transformation implements
//! - ExecutionOrder / OperationSequence: validated, ordered operation lists
//! - StateComparer / StateDifference: structural equality and differencing
//! - StateTransition: a recorded run from initial to final state
//! - OrderValidator: ordering constraints and a quick sensitivity check
//! - StatefulSystem: a system that advances a current state
//! - EventSourcingSystem: an event log whose replay order can be varied
//! - WorkflowSystem: steps with dependencies, run in dependency order
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod comparer;
pub mod error;
pub mod event_sourcing;
pub mod operation;
pub mod sequence;
pub mod state;
pub mod system;
pub mod timestamp;
pub mod transition;
pub mod validator;
pub mod value;
pub mod workflow;

pub use comparer::{StateComparer, StateDifference, WHOLE_STATE_KEY};
pub use error::{Error, Result};
pub use event_sourcing::{Event, EventSourcingSystem};
pub use operation::{operation_addr, Operation, OperationMetadata, OperationRef};
pub use sequence::{ExecutionOrder, OperationSequence};
pub use state::State;
pub use system::StatefulSystem;
pub use timestamp::Timestamp;
pub use transition::StateTransition;
pub use validator::{OrderValidator, OrderingConstraint, SequenceValidation};
pub use value::{FromValue, Value};
pub use workflow::{WorkflowStep, WorkflowSystem};

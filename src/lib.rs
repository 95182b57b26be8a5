//! ordersense - detects operations whose outcome depends on execution order
//!
//! Operations are pure transformations over an immutable [`State`]. A pair
//! is order-sensitive when running it in the two possible orders from the
//! same state ends in different states, or when only one order fails a
//! precondition.
//!
//! # Quick Start
//!
//! ```ignore
//! use ordersense::{detect_state_based, OperationRef, State};
//!
//! let ops: Vec<OperationRef> = vec![deposit, apply_fee];
//! let initial = State::new().with_property("balance", 100.0)?;
//!
//! let result = detect_state_based(&ops, &initial)?;
//! for pair in &result.order_sensitive_pairs {
//!     println!("{} / {}", pair.first.name(), pair.second.name());
//! }
//! ```
//!
//! The execution model lives in `ordersense-core`, the detectors in
//! `ordersense-detect`; both are re-exported here.

pub use ordersense_core::*;
pub use ordersense_detect::*;

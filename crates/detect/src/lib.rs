//! Order-sensitivity detectors
//!
//! A set of operations is order-sensitive when some pair of them, run from
//! the same initial state in both orders, ends in different states. The
//! detectors here test pairs rather than permutations:
//!
//! - [`HeuristicDetector`]: state-based, dependency-based and hybrid scans
//! - [`OptimizedDetector`]: state-based scan with a transition cache, early
//!   termination and an optional parallel mode
//! - [`DependencyGraph`]: the pair-selection heuristic behind dependency-based
//!   detection
//!
//! Pairwise testing cannot see order effects that only appear with three or
//! more operations interleaved; a clean result is not a proof of
//! commutativity.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cache;
mod commute;
pub mod config;
pub mod graph;
pub mod heuristic;
pub mod optimized;
pub mod result;

pub use config::{DetectorConfig, FailurePolicy};
pub use graph::DependencyGraph;
pub use heuristic::{detect_dependency_based, detect_hybrid, detect_state_based, HeuristicDetector};
pub use optimized::OptimizedDetector;
pub use result::{DetectionResult, DetectionStrategy, OrderSensitivePair, PairOrder, Violation};

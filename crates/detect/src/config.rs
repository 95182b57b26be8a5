//! Detector configuration
//!
//! Configuration can be built in code or read from TOML:
//!
//! ```toml
//! early_termination = true
//! parallel = true
//! worker_threads = 4
//! max_cache_entries = 100000
//! failure_policy = "treat_as_violation"
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use ordersense_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What a detector does when exactly one ordering of a pair fails a precondition
///
/// A failure in both orderings, or any error other than
/// `Error::PreconditionFailure`, always aborts the detection call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the pair as order-sensitive, carrying the failure as evidence
    #[default]
    TreatAsViolation,
    /// Abort the detection call with the failure
    Propagate,
}

/// Options for [`OptimizedDetector`](crate::OptimizedDetector)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Stop at the first violating pair
    pub early_termination: bool,
    /// Spread the outer loop of the pair matrix across worker threads
    pub parallel: bool,
    /// Size of a dedicated worker pool; `None` uses the global rayon pool
    pub worker_threads: Option<usize>,
    /// Upper bound on cached transitions; `None` is unbounded
    pub max_cache_entries: Option<usize>,
    /// Handling of one-sided precondition failures
    pub failure_policy: FailurePolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            early_termination: true,
            parallel: false,
            worker_threads: None,
            max_cache_entries: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl DetectorConfig {
    /// Reject settings that cannot run
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `worker_threads` or `max_cache_entries` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == Some(0) {
            return Err(Error::InvalidArgument(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.max_cache_entries == Some(0) {
            return Err(Error::InvalidArgument(
                "max_cache_entries must be at least 1; omit it for an unbounded cache".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DetectorConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse detector config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// The default configuration as commented TOML
    pub fn default_toml() -> &'static str {
        r#"# ordersense detector configuration
#
# Stop scanning at the first order-sensitive pair (default: true)
early_termination = true

# Test the pair matrix on worker threads (default: false)
parallel = false

# Dedicated worker pool size; omit to use the global pool
# worker_threads = 4

# Bound on cached state transitions; omit for unbounded
# max_cache_entries = 100000

# One-sided precondition failures: "treat_as_violation" (default) or "propagate"
failure_policy = "treat_as_violation"
"#
    }
}

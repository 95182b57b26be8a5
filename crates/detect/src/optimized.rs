//! Cached, optionally parallel pairwise detector
//!
//! Scans the same `(i, j)` matrix as state-based detection, with every
//! execution routed through a [`TransitionCache`] that lives as long as the
//! detector. Repeated calls over overlapping operations and states reuse it.
//!
//! ## Modes
//!
//! - **Sequential**: lexicographic `(i, j)` order. With early termination the
//!   scan stops after the first violating pair, so the reported pair is
//!   deterministic.
//! - **Parallel**: the outer index `i` is spread across a rayon pool; each
//!   task scans `j > i` in increasing order. With early termination a shared
//!   flag is checked before each pair, and in-flight tasks finish the pair
//!   they are on. More than one violation may be reported and `pairs_tested`
//!   varies between runs.

use crate::cache::{Cached, TransitionCache};
use crate::commute::{commute, PairOutcome};
use crate::config::DetectorConfig;
use crate::heuristic::total_pairs;
use crate::result::{DetectionResult, DetectionStrategy, OrderSensitivePair};
use ordersense_core::{Error, OperationRef, Result, State};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Pairwise detector with a persistent transition cache
#[derive(Debug)]
pub struct OptimizedDetector {
    config: DetectorConfig,
    cache: TransitionCache,
    pool: Option<rayon::ThreadPool>,
}

impl OptimizedDetector {
    /// Detector with the given flags and otherwise default configuration
    pub fn new(early_termination: bool, parallel: bool) -> Self {
        let config = DetectorConfig {
            early_termination,
            parallel,
            ..DetectorConfig::default()
        };
        OptimizedDetector {
            cache: TransitionCache::new(config.max_cache_entries),
            config,
            pool: None,
        }
    }

    /// Detector for a validated configuration
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an invalid configuration, `Config` if the
    /// dedicated worker pool cannot be started.
    pub fn with_config(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.worker_threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("ordersense-worker-{}", i))
                    .build()
                    .map_err(|e| Error::Config(format!("Failed to start worker pool: {}", e)))?,
            ),
            None => None,
        };
        Ok(OptimizedDetector {
            cache: TransitionCache::new(config.max_cache_entries),
            config,
            pool,
        })
    }

    /// The configuration in effect
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Commute every pair of `operations` from `initial` through the cache
    pub fn detect_with_caching(
        &self,
        operations: &[OperationRef],
        initial: &State,
    ) -> Result<DetectionResult> {
        if operations.len() < 2 {
            return Ok(DetectionResult::insensitive(DetectionStrategy::Optimized));
        }
        let start = Instant::now();
        let hits = AtomicUsize::new(0);
        let transition = Cached {
            cache: &self.cache,
            hits: &hits,
        };

        let (found, tested, stopped) = if self.config.parallel {
            self.scan_parallel(&transition, operations, initial)?
        } else {
            self.scan_sequential(&transition, operations, initial)?
        };

        let detection_time = start.elapsed();
        let cache_hits = hits.load(Ordering::Relaxed);
        let terminated_early = stopped && tested < total_pairs(operations.len());
        info!(
            target: "ordersense::detect",
            strategy = ?DetectionStrategy::Optimized,
            parallel = self.config.parallel,
            pairs_tested = tested,
            violations = found.len(),
            cache_hits,
            cache_size = self.cache.len(),
            terminated_early,
            elapsed_us = detection_time.as_micros() as u64,
            "Detection complete"
        );

        Ok(DetectionResult {
            is_order_sensitive: !found.is_empty(),
            order_sensitive_pairs: found,
            pairs_tested: tested,
            cache_hits,
            detection_time,
            terminated_early,
            strategy: DetectionStrategy::Optimized,
        })
    }

    /// Drop every cached transition
    ///
    /// Must not race an in-flight detection call on the same detector.
    pub fn clear_cache(&self) {
        let dropped = self.cache.len();
        self.cache.clear();
        debug!(target: "ordersense::cache", dropped, "Transition cache cleared");
    }

    /// Cached transition count, reported twice as `(size, size)`
    ///
    /// The entry bound, if any, is [`cache_bound`](Self::cache_bound).
    pub fn cache_stats(&self) -> (usize, usize) {
        let size = self.cache.len();
        (size, size)
    }

    /// Configured `max_cache_entries`; `None` when unbounded
    pub fn cache_bound(&self) -> Option<usize> {
        self.cache.max_entries()
    }

    fn scan_sequential(
        &self,
        transition: &Cached<'_>,
        operations: &[OperationRef],
        initial: &State,
    ) -> Result<(Vec<OrderSensitivePair>, usize, bool)> {
        let n = operations.len();
        let mut found = Vec::new();
        let mut tested = 0;

        'outer: for i in 0..n {
            for j in i + 1..n {
                tested += 1;
                if let Some(pair) = self.test_pair(transition, operations, i, j, initial)? {
                    found.push(pair);
                    if self.config.early_termination {
                        break 'outer;
                    }
                }
            }
        }

        let stopped = self.config.early_termination && !found.is_empty();
        Ok((found, tested, stopped))
    }

    fn scan_parallel(
        &self,
        transition: &Cached<'_>,
        operations: &[OperationRef],
        initial: &State,
    ) -> Result<(Vec<OrderSensitivePair>, usize, bool)> {
        let n = operations.len();
        let early = self.config.early_termination;
        let stop = AtomicBool::new(false);
        let tested = AtomicUsize::new(0);
        let found = Mutex::new(Vec::new());

        let scan = || {
            (0..n).into_par_iter().try_for_each(|i| -> Result<()> {
                for j in i + 1..n {
                    if early && stop.load(Ordering::Acquire) {
                        return Ok(());
                    }
                    tested.fetch_add(1, Ordering::Relaxed);
                    if let Some(pair) = self.test_pair(transition, operations, i, j, initial)? {
                        found.lock().push(pair);
                        if early {
                            stop.store(true, Ordering::Release);
                            return Ok(());
                        }
                    }
                }
                Ok(())
            })
        };
        match &self.pool {
            Some(pool) => pool.install(scan)?,
            None => scan()?,
        }

        let mut found = found.into_inner();
        found.sort_by_key(OrderSensitivePair::indices);
        Ok((found, tested.into_inner(), stop.into_inner()))
    }

    fn test_pair(
        &self,
        transition: &Cached<'_>,
        operations: &[OperationRef],
        i: usize,
        j: usize,
        initial: &State,
    ) -> Result<Option<OrderSensitivePair>> {
        let (a, b) = (&operations[i], &operations[j]);
        match commute(transition, a, b, initial, self.config.failure_policy)? {
            PairOutcome::Commutes => Ok(None),
            PairOutcome::Violates(violation) => {
                debug!(
                    target: "ordersense::detect",
                    first = a.name(),
                    second = b.name(),
                    i,
                    j,
                    "Order-sensitive pair"
                );
                Ok(Some(OrderSensitivePair {
                    first: a.clone(),
                    second: b.clone(),
                    first_index: i,
                    second_index: j,
                    violation,
                }))
            }
        }
    }
}

impl Default for OptimizedDetector {
    fn default() -> Self {
        OptimizedDetector::new(true, false)
    }
}

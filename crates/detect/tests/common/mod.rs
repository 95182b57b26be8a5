//! Shared fixtures for the detector integration tests.
//!
//! Import via `mod common;` from any test file.

#![allow(dead_code)]

use ordersense_core::{Error, Operation, OperationMetadata, OperationRef, Result, State, Value};
use proptest::prelude::*;
use std::sync::{Arc, Once};

pub const BALANCE: &str = "balance";

// ============================================================================
// Ledger operations
// ============================================================================

/// Adds a fixed amount; commutes with other deposits
#[derive(Debug)]
pub struct Deposit(pub f64);

impl Operation for Deposit {
    fn name(&self) -> &str {
        "Deposit"
    }

    fn is_order_sensitive(&self) -> bool {
        false
    }

    fn execute(&self, state: &State) -> Result<State> {
        let balance = state.get_property(BALANCE, 0.0f64);
        state.with_property(BALANCE, balance + self.0)
    }
}

/// Deducts a percentage of the current balance
#[derive(Debug)]
pub struct ApplyFee(pub f64);

impl Operation for ApplyFee {
    fn name(&self) -> &str {
        "ApplyFee"
    }

    fn is_order_sensitive(&self) -> bool {
        true
    }

    fn execute(&self, state: &State) -> Result<State> {
        let balance = state.get_property(BALANCE, 0.0f64);
        state.with_property(BALANCE, balance - balance * self.0 / 100.0)
    }

    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::described(format!("Apply a {}% fee", self.0))
            .with_parameter("percent", self.0)
    }
}

/// Removes a fixed amount, refusing to overdraw
#[derive(Debug)]
pub struct Withdraw(pub f64);

impl Operation for Withdraw {
    fn name(&self) -> &str {
        "Withdraw"
    }

    fn is_order_sensitive(&self) -> bool {
        true
    }

    fn execute(&self, state: &State) -> Result<State> {
        let balance = state.get_property(BALANCE, 0.0f64);
        if balance < self.0 {
            return Err(Error::precondition(
                "Withdraw",
                format!("balance {} is below {}", balance, self.0),
            ));
        }
        state.with_property(BALANCE, balance - self.0)
    }
}

/// Overwrites a configuration key; last writer wins
#[derive(Debug)]
pub struct ConfigOverride {
    pub key: &'static str,
    pub value: Value,
}

impl ConfigOverride {
    pub fn new(key: &'static str, value: impl Into<Value>) -> Self {
        ConfigOverride {
            key,
            value: value.into(),
        }
    }
}

impl Operation for ConfigOverride {
    fn name(&self) -> &str {
        "ConfigOverride"
    }

    fn is_order_sensitive(&self) -> bool {
        true
    }

    fn execute(&self, state: &State) -> Result<State> {
        state.with_property(self.key, self.value.clone())
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn op<O: Operation + 'static>(o: O) -> OperationRef {
    Arc::new(o)
}

pub fn ledger(balance: f64) -> State {
    State::new()
        .with_property(BALANCE, balance)
        .expect("valid key")
}

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output to the test harness
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Strategies
// ============================================================================

/// Operations that never fail, so every pair has a verdict
pub fn arb_infallible_op() -> impl Strategy<Value = OperationRef> {
    prop_oneof![
        (1i64..500).prop_map(|n| op(Deposit(n as f64))),
        (1i64..50).prop_map(|p| op(ApplyFee(p as f64))),
        (prop::sample::select(vec!["mode", "region"]), 0i64..3)
            .prop_map(|(key, v)| op(ConfigOverride::new(key, v))),
    ]
}

pub fn arb_ops(max: usize) -> impl Strategy<Value = Vec<OperationRef>> {
    prop::collection::vec(arb_infallible_op(), 0..max)
}

pub fn arb_ledger() -> impl Strategy<Value = State> {
    (0i64..1_000).prop_map(|b| ledger(b as f64))
}

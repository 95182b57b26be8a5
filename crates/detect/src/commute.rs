//! The commutation test shared by every detector
//!
//! A pair commutes when running `a` then `b` and `b` then `a` from the same
//! initial state ends in structurally equal states. How a single transition
//! is computed is abstracted behind [`Transition`] so the optimized detector
//! can route executions through its cache.

use crate::config::FailurePolicy;
use crate::result::{PairOrder, Violation};
use ordersense_core::{OperationRef, Result, State, StateComparer};
use tracing::warn;

/// Computes `op` applied to `state`
pub(crate) trait Transition: Sync {
    fn apply(&self, op: &OperationRef, state: &State) -> Result<State>;
}

/// Calls `Operation::execute` every time
pub(crate) struct Direct;

impl Transition for Direct {
    fn apply(&self, op: &OperationRef, state: &State) -> Result<State> {
        op.execute(state)
    }
}

/// Outcome of commuting one pair
#[derive(Debug)]
pub(crate) enum PairOutcome {
    Commutes,
    Violates(Violation),
}

/// Run `a→b` and `b→a` from `initial` and classify the pair
///
/// One-sided precondition failures are handled per `policy`. Failures in
/// both orderings, and errors that are not precondition failures, propagate.
pub(crate) fn commute<T: Transition + ?Sized>(
    transition: &T,
    a: &OperationRef,
    b: &OperationRef,
    initial: &State,
    policy: FailurePolicy,
) -> Result<PairOutcome> {
    let forward = transition
        .apply(a, initial)
        .and_then(|s| transition.apply(b, &s));
    let backward = transition
        .apply(b, initial)
        .and_then(|s| transition.apply(a, &s));

    match (forward, backward) {
        (Ok(forward), Ok(backward)) => {
            if StateComparer::are_equal(&forward, &backward) {
                Ok(PairOutcome::Commutes)
            } else {
                let difference = StateComparer::get_difference(&forward, &backward);
                Ok(PairOutcome::Violates(Violation::Divergence {
                    forward,
                    backward,
                    difference,
                }))
            }
        }
        (Err(error), Ok(surviving_state)) => {
            one_sided(a, b, error, surviving_state, PairOrder::FirstThenSecond, policy)
        }
        (Ok(surviving_state), Err(error)) => {
            one_sided(a, b, error, surviving_state, PairOrder::SecondThenFirst, policy)
        }
        (Err(error), Err(_)) => Err(error),
    }
}

fn one_sided(
    a: &OperationRef,
    b: &OperationRef,
    error: ordersense_core::Error,
    surviving_state: State,
    failed_order: PairOrder,
    policy: FailurePolicy,
) -> Result<PairOutcome> {
    if policy == FailurePolicy::Propagate || !error.is_precondition_failure() {
        return Err(error);
    }
    warn!(
        target: "ordersense::detect",
        first = a.name(),
        second = b.name(),
        ?failed_order,
        %error,
        "Precondition failed in one ordering only"
    );
    Ok(PairOutcome::Violates(Violation::AsymmetricFailure {
        failed_order,
        error,
        surviving_state,
    }))
}

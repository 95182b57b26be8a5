//! Event-sourced systems
//!
//! An [`EventSourcingSystem`] keeps an append-only log of [`Event`]s next to
//! the state they produced. Each appended event gets the next sequence
//! number. State can be rebuilt by replaying the log, either in sequence
//! order or in some other order to expose replay divergence.
//!
//! Events carry data only. The caller supplies the mapping from an event to
//! the [`Operation`](crate::Operation) that applies it, both when appending
//! and when replaying.

use crate::error::Result;
use crate::operation::{Operation, OperationRef};
use crate::state::State;
use crate::timestamp::Timestamp;
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::trace;

/// A recorded fact
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event kind, e.g. `"Deposited"`
    pub event_type: String,
    /// Payload
    pub data: BTreeMap<String, Value>,
    /// When the event was raised
    pub timestamp: Timestamp,
    /// Position in the log; assigned on append
    pub sequence_number: u64,
}

impl Event {
    /// An event of `event_type` raised now, with no payload
    pub fn new(event_type: impl Into<String>) -> Self {
        Event {
            event_type: event_type.into(),
            data: BTreeMap::new(),
            timestamp: Timestamp::now(),
            sequence_number: 0,
        }
    }

    /// Add a payload entry
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Override the raise time
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Event log plus the state it has produced so far
#[derive(Debug, Clone, Default)]
pub struct EventSourcingSystem {
    log: Vec<Event>,
    initial: State,
    current: State,
}

impl EventSourcingSystem {
    /// Empty log starting from `initial`
    pub fn new(initial: State) -> Self {
        EventSourcingSystem {
            log: Vec::new(),
            current: initial.clone(),
            initial,
        }
    }

    /// Events appended so far, in append order
    pub fn event_log(&self) -> &[Event] {
        &self.log
    }

    /// State after every appended event
    pub fn current_state(&self) -> &State {
        &self.current
    }

    /// Apply `operation` and record `event` with the next sequence number
    ///
    /// If the operation fails, neither the log nor the state changes.
    pub fn append_event(&mut self, mut event: Event, operation: &dyn Operation) -> Result<&State> {
        let next = operation.execute(&self.current)?;
        event.sequence_number = self.log.len() as u64;
        trace!(
            target: "ordersense::system",
            event_type = %event.event_type,
            sequence_number = event.sequence_number,
            "Appending event"
        );
        self.log.push(event);
        self.current = next;
        Ok(&self.current)
    }

    /// Rebuild state from `events` in sequence-number order
    ///
    /// Replay starts from the initial state the system was created with.
    pub fn replay_events<F>(&self, events: &[Event], to_operation: F) -> Result<State>
    where
        F: FnMut(&Event) -> Result<OperationRef>,
    {
        self.replay_sorted(events, to_operation, |a, b| {
            a.sequence_number.cmp(&b.sequence_number)
        })
    }

    /// Rebuild state from the whole log
    pub fn replay_all<F>(&self, to_operation: F) -> Result<State>
    where
        F: FnMut(&Event) -> Result<OperationRef>,
    {
        self.replay_events(&self.log, to_operation)
    }

    /// Rebuild state from `events` ordered by `compare` instead of sequence
    ///
    /// The sort is stable, so events `compare` considers equal keep their
    /// relative order.
    pub fn replay_in_different_order<F, C>(
        &self,
        events: &[Event],
        to_operation: F,
        compare: C,
    ) -> Result<State>
    where
        F: FnMut(&Event) -> Result<OperationRef>,
        C: FnMut(&Event, &Event) -> Ordering,
    {
        self.replay_sorted(events, to_operation, compare)
    }

    /// Rebuild state from `events` ordered by raise time
    pub fn replay_by_timestamp<F>(&self, events: &[Event], to_operation: F) -> Result<State>
    where
        F: FnMut(&Event) -> Result<OperationRef>,
    {
        self.replay_sorted(events, to_operation, |a, b| a.timestamp.cmp(&b.timestamp))
    }

    fn replay_sorted<F, C>(&self, events: &[Event], mut to_operation: F, mut compare: C) -> Result<State>
    where
        F: FnMut(&Event) -> Result<OperationRef>,
        C: FnMut(&Event, &Event) -> Ordering,
    {
        let mut ordered: Vec<&Event> = events.iter().collect();
        ordered.sort_by(|a, b| compare(a, b));

        let mut state = self.initial.clone();
        for event in ordered {
            state = to_operation(event)?.execute(&state)?;
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Deposit(i64);

    impl Operation for Deposit {
        fn name(&self) -> &str {
            "Deposit"
        }

        fn is_order_sensitive(&self) -> bool {
            false
        }

        fn execute(&self, state: &State) -> Result<State> {
            let balance = state.get_property("balance", 0i64);
            state.with_property("balance", balance + self.0)
        }
    }

    #[derive(Debug)]
    struct Double;

    impl Operation for Double {
        fn name(&self) -> &str {
            "Double"
        }

        fn is_order_sensitive(&self) -> bool {
            true
        }

        fn execute(&self, state: &State) -> Result<State> {
            let balance = state.get_property("balance", 0i64);
            state.with_property("balance", balance * 2)
        }
    }

    #[derive(Debug)]
    struct Reject;

    impl Operation for Reject {
        fn name(&self) -> &str {
            "Reject"
        }

        fn is_order_sensitive(&self) -> bool {
            true
        }

        fn execute(&self, _state: &State) -> Result<State> {
            Err(Error::precondition("Reject", "always"))
        }
    }

    fn to_operation(event: &Event) -> Result<OperationRef> {
        match event.event_type.as_str() {
            "Deposited" => Ok(Arc::new(Deposit(event.data["amount"].as_int().unwrap_or(0)))),
            "Doubled" => Ok(Arc::new(Double)),
            other => Err(Error::InvalidArgument(format!("unknown event {}", other))),
        }
    }

    fn deposited(amount: i64) -> Event {
        Event::new("Deposited").with_data("amount", amount)
    }

    /// Deposit 10, double, deposit 5: 25 in log order
    fn populated() -> EventSourcingSystem {
        let mut system = EventSourcingSystem::default();
        system
            .append_event(deposited(10).at(Timestamp::from_micros(3)), &Deposit(10))
            .unwrap();
        system
            .append_event(Event::new("Doubled").at(Timestamp::from_micros(2)), &Double)
            .unwrap();
        system
            .append_event(deposited(5).at(Timestamp::from_micros(1)), &Deposit(5))
            .unwrap();
        system
    }

    #[test]
    fn test_append_assigns_sequence_numbers_and_applies() {
        let system = populated();
        let numbers: Vec<u64> = system.event_log().iter().map(|e| e.sequence_number).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
        assert_eq!(system.current_state().get_property("balance", 0i64), 25);
    }

    #[test]
    fn test_failed_append_changes_nothing() {
        let mut system = populated();
        assert!(system.append_event(Event::new("Rejected"), &Reject).is_err());
        assert_eq!(system.event_log().len(), 3);
        assert_eq!(system.current_state().get_property("balance", 0i64), 25);
    }

    #[test]
    fn test_replay_all_matches_current_state() {
        let system = populated();
        let replayed = system.replay_all(to_operation).unwrap();
        assert_eq!(&replayed, system.current_state());
    }

    #[test]
    fn test_replay_events_sorts_by_sequence_number() {
        let system = populated();
        let mut shuffled = system.event_log().to_vec();
        shuffled.reverse();
        let replayed = system.replay_events(&shuffled, to_operation).unwrap();
        assert_eq!(replayed.get_property("balance", 0i64), 25);
    }

    #[test]
    fn test_replay_in_different_order_diverges() {
        let system = populated();
        // Reverse sequence order: deposit 5, double, deposit 10
        let replayed = system
            .replay_in_different_order(system.event_log(), to_operation, |a, b| {
                b.sequence_number.cmp(&a.sequence_number)
            })
            .unwrap();
        assert_eq!(replayed.get_property("balance", 0i64), 20);

        let by_time = system
            .replay_by_timestamp(system.event_log(), to_operation)
            .unwrap();
        assert_eq!(by_time, replayed);
    }

    #[test]
    fn test_replay_starts_from_initial_state() {
        let initial = State::new().with_property("balance", 100i64).unwrap();
        let mut system = EventSourcingSystem::new(initial);
        system.append_event(deposited(1), &Deposit(1)).unwrap();
        let replayed = system.replay_all(to_operation).unwrap();
        assert_eq!(replayed.get_property("balance", 0i64), 101);
    }

    #[test]
    fn test_unmapped_event_fails_replay() {
        let system = populated();
        let events = vec![Event::new("Unknown")];
        let err = system.replay_events(&events, to_operation).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}

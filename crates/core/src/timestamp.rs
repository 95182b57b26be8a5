//! Wall-clock stamps for states and events
//!
//! A [`State`](crate::State) records when it was derived and an
//! [`Event`](crate::Event) when it was raised. Neither affects state
//! equality; events are ordered by their stamp only when a replay asks for
//! timestamp order.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Microseconds since the Unix epoch; `Default` is the epoch itself
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The current moment, or the epoch if the clock reads before it
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(since_epoch.as_micros() as u64)
    }

    /// Wrap a raw microsecond count
    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// Raw microsecond count
    pub const fn as_micros(&self) -> u64 {
        self.0
    }
}

//! Timestamp utilities
//!
//! Dispatch records carry UTC timestamps that never go backwards within one
//! process, even if the wall clock steps back between appends.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Hands out non-decreasing UTC timestamps
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time, clamped to be no earlier than the last value handed out
    pub fn now(&self) -> DateTime<Utc> {
        self.observe(Utc::now())
    }

    fn observe(&self, wall: DateTime<Utc>) -> DateTime<Utc> {
        // A poisoned lock only means another thread panicked mid-update; the
        // stored value is still a valid timestamp.
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let stamp = match *last {
            Some(prev) if prev > wall => prev,
            _ => wall,
        };
        *last = Some(stamp);
        stamp
    }
}

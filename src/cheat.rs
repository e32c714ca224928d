//! Cancellation ("cheat") tracking
//!
//! The user can declare they are allowed to be where they are. Only a
//! declaration made after the active trigger was created suppresses its
//! report.

use crate::domain::SnitchTrigger;

/// Holds the timestamp of the most recent user-issued cancellation
#[derive(Debug, Clone, Default)]
pub struct CheatTracker {
    last_cancellation_ms: Option<u64>,
}

impl CheatTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cancellation; overwrites any earlier one
    pub fn record_cancellation(&mut self, now_ms: u64) {
        self.last_cancellation_ms = Some(now_ms);
        log::info!("Cancellation recorded at {}", now_ms);
    }

    /// True iff a cancellation exists strictly after the trigger's creation
    pub fn is_cancellation_valid(&self, trigger: &SnitchTrigger) -> bool {
        self.last_cancellation_ms
            .is_some_and(|at| at > trigger.created_at_ms)
    }

    pub fn last_cancellation_ms(&self) -> Option<u64> {
        self.last_cancellation_ms
    }

    pub fn clear(&mut self) {
        self.last_cancellation_ms = None;
    }
}

//! Scheduler that only records requests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clock::Clock;
use crate::scheduler::Scheduler;

/// Records every `request_wake` without arming anything. Lets tests drive
/// wakes by hand and assert on the re-arm count and delays.
pub struct RecordingScheduler {
    clock: Arc<dyn Clock>,
    requests: Mutex<Vec<Duration>>,
    deadline: Mutex<Option<u64>>,
}

impl RecordingScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            requests: Mutex::new(Vec::new()),
            deadline: Mutex::new(None),
        }
    }

    pub fn requests(&self) -> Vec<Duration> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn last_delay(&self) -> Option<Duration> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).last().copied()
    }
}

impl Scheduler for RecordingScheduler {
    fn request_wake(&self, delay: Duration) {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).push(delay);
        let deadline = self.clock.now_ms().saturating_add(delay.as_millis() as u64);
        *self.deadline.lock().unwrap_or_else(|e| e.into_inner()) = Some(deadline);
    }

    fn next_wake_deadline(&self) -> Option<u64> {
        *self.deadline.lock().unwrap_or_else(|e| e.into_inner())
    }
}

//! Scheduler facade - owns the single pending wake of the loop
//!
//! Every `request_wake` replaces whatever wake was pending before it (last
//! writer wins). Wakes are delivered as tokens on a channel so the driver
//! can handle them one at a time.

pub mod facade;
pub mod recording;

pub use facade::{Scheduler, TokioScheduler, WakeToken};
pub use recording::RecordingScheduler;

//! Loop controller - owns the current state and drives wakes
//!
//! - LoopController: handles one wake at a time and always re-arms
//! - LoopRunner: receives wake tokens and feeds them to the controller
//! - publisher: worker that sends reports to the API off the wake path

pub mod loop_controller;
pub mod publisher;
pub mod runner;

pub use loop_controller::{LoopController, LoopDeps, LoopStatus, Outbound, WakeReport};
pub use publisher::{PublishStats, ReportReceiver, ReportSender, report_channel, run_publisher};
pub use runner::LoopRunner;

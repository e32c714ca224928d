//! snitchloop - a self-rescheduling location-monitoring loop
//!
//! Each wake samples one position fix, checks whether the user is dwelling
//! at a known restaurant, escalates through a warning with a cancellable
//! grace window, and publishes a report if the user neither leaves nor
//! cancels in time. Every wake ends in exactly one re-arm of the next one.

pub mod api;
pub mod cheat;
pub mod clock;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod geo;
pub mod location;
pub mod notify;
pub mod scheduler;
pub mod state;

pub use error::{Result, SnitchError};

//! Domain types for snitchloop
//!
//! This module contains all core domain types:
//! - Position / LatLon: device fixes and their wire coordinates
//! - Restaurant: opaque establishment record returned by the lookup API
//! - SnitchTrigger: a dwell event under escalation
//! - SnitchReport: the body published when a trigger expires

pub mod position;
pub mod restaurant;
pub mod trigger;

pub use position::{LatLon, Position};
pub use restaurant::Restaurant;
pub use trigger::{SnitchReport, SnitchTrigger};

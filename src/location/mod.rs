//! Position source port
//!
//! The loop asks for exactly one fix per wake. Sources may take as long as
//! the platform needs; the controller bounds the wait with its fix timeout.

pub mod replay;
pub mod source;

pub use replay::ReplaySource;
pub use source::{PositionSource, ScriptedSource};

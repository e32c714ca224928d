//! Loop state machine
//!
//! ```text
//!            match                       grace elapsed / cancelled / moved away
//!  Base ─────────────────► ActiveWarning ─────────────────────────────────► Base
//!   │                            ▲
//!   │ match (dwell confirmation) │ still there
//!   ▼                            │
//!  WillLeave ──still there──► WillStay
//!   │                            │
//!   └──────── moved away ────────┴──────────────────────────────────────► Base
//! ```
//!
//! States never schedule anything themselves. Handling a fix yields a
//! [`Transition`]; the controller applies it and performs the single re-arm.

pub mod loop_state;
pub mod transition;

pub use loop_state::{DwellCandidate, LoopState, WakeContext};
pub use transition::{Effect, Transition};

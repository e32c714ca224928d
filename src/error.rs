//! Error types for snitchloop
//!
//! Centralized error handling using thiserror. API calls have their own
//! [`ApiError`](crate::api::ApiError) since the loop collapses those into
//! "no match" or a logged publish failure rather than propagating them.

use thiserror::Error;

/// Errors surfaced by the library outside the wake path
#[derive(Debug, Error)]
pub enum SnitchError {
    /// Position source failed to produce a usable fix
    #[error("Location error: {0}")]
    Location(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for snitchloop operations
pub type Result<T> = std::result::Result<T, SnitchError>;

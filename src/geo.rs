//! Significant-movement detection
//!
//! Distance is measured in raw latitude/longitude degrees with no
//! correction for latitude. A degree of longitude shrinks toward the poles,
//! so the effective radius is smaller east-west than north-south away from
//! the equator. The radius is tuned empirically against that metric.

use crate::domain::Position;

/// Default significance radius in degrees
pub const DEFAULT_SIGNIFICANT_RADIUS: f64 = 0.00001;

/// Euclidean distance between two fixes in degree space
pub fn degree_distance(a: &Position, b: &Position) -> f64 {
    let d_lon = b.longitude - a.longitude;
    let d_lat = b.latitude - a.latitude;
    (d_lon * d_lon + d_lat * d_lat).sqrt()
}

/// Decide whether `current` differs significantly from `previous`.
///
/// With no previous fix the current one is always significant. The boundary
/// is inclusive: a distance exactly equal to `radius` counts as movement.
pub fn has_moved_significantly(previous: Option<&Position>, current: &Position, radius: f64) -> bool {
    match previous {
        None => true,
        Some(prev) => degree_distance(prev, current) >= radius,
    }
}

/// The single retained "last known position" of the loop
#[derive(Debug, Clone, Default)]
pub struct LastKnownPosition {
    radius: f64,
    position: Option<Position>,
}

impl LastKnownPosition {
    pub fn new(radius: f64) -> Self {
        Self { radius, position: None }
    }

    pub fn get(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Offer a new fix. It replaces the retained one only when the move is
    /// significant; returns whether it did.
    pub fn observe(&mut self, fix: Position) -> bool {
        let moved = has_moved_significantly(self.position.as_ref(), &fix, self.radius);
        if moved {
            log::debug!(
                "Significant move to lat={} lon={} (speed {})",
                fix.latitude,
                fix.longitude,
                fix.speed
            );
            self.position = Some(fix);
        }
        moved
    }
}

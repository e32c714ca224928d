//! Device position fixes

use serde::{Deserialize, Serialize};

/// A single fix from the platform location provider.
///
/// Immutable once captured. Replay files store one of these per line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Ground speed in m/s as reported by the provider
    #[serde(default)]
    pub speed: f64,
    /// When the fix was captured (Unix ms)
    pub timestamp_ms: u64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: u64) -> Self {
        Self {
            latitude,
            longitude,
            speed: 0.0,
            timestamp_ms,
        }
    }

    /// Coordinates in the shape the API expects
    pub fn coords(&self) -> LatLon {
        LatLon {
            lat: self.latitude,
            lon: self.longitude,
        }
    }
}

/// Latitude/longitude pair as sent over the wire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

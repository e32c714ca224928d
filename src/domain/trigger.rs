//! Snitch triggers and the reports they turn into

use serde::{Deserialize, Serialize};

use super::{LatLon, Position, Restaurant};

/// A dwell event under escalation toward a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnitchTrigger {
    /// When the trigger was created (Unix ms)
    pub created_at_ms: u64,
    /// Fix at which the dwell was detected
    pub origin: Position,
    /// Establishment the user is dwelling at
    pub restaurant: Restaurant,
}

impl SnitchTrigger {
    pub fn new(created_at_ms: u64, origin: Position, restaurant: Restaurant) -> Self {
        Self {
            created_at_ms,
            origin,
            restaurant,
        }
    }

    /// Instant at which the grace window closes
    pub fn expires_at_ms(&self, grace_ms: u64) -> u64 {
        self.created_at_ms.saturating_add(grace_ms)
    }

    /// Build the report published when this trigger expires
    pub fn to_report(&self, user_id: impl Into<String>) -> SnitchReport {
        SnitchReport {
            user_id: user_id.into(),
            origin_coords: self.origin.coords(),
            restaurant_data: self.restaurant.clone(),
        }
    }
}

/// Body of the publish request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnitchReport {
    pub user_id: String,
    pub origin_coords: LatLon,
    pub restaurant_data: Restaurant,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trigger() -> SnitchTrigger {
        SnitchTrigger::new(
            10_000,
            Position::new(40.0, -70.0, 10_000),
            Restaurant::new("Burger Barn", "bb-17"),
        )
    }

    #[test]
    fn test_expires_at() {
        assert_eq!(trigger().expires_at_ms(30_000), 40_000);
    }

    #[test]
    fn test_expires_at_saturates() {
        let mut t = trigger();
        t.created_at_ms = u64::MAX - 1;
        assert_eq!(t.expires_at_ms(30_000), u64::MAX);
    }

    #[test]
    fn test_to_report_wire_format() {
        let report = trigger().to_report("user-1");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["userId"], json!("user-1"));
        assert_eq!(json["originCoords"], json!({"lat": 40.0, "lon": -70.0}));
        assert_eq!(json["restaurantData"]["name"], json!("Burger Barn"));
    }
}

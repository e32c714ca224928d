//! Establishment records returned by the lookup API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::LatLon;

/// Opaque restaurant record. The loop only reads it and echoes it back in
/// reports, so fields it does not know about are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub coords: Option<LatLon>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Restaurant {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            coords: None,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_restaurant_keeps_unknown_fields() {
        let restaurant: Restaurant = serde_json::from_value(json!({
            "name": "Burger Barn",
            "id": "bb-17",
            "coords": {"lat": 40.0, "lon": -70.0},
            "cuisine": "burgers"
        }))
        .unwrap();

        assert_eq!(restaurant.name, "Burger Barn");
        assert_eq!(restaurant.coords, Some(LatLon { lat: 40.0, lon: -70.0 }));
        assert_eq!(restaurant.extra.get("cuisine"), Some(&json!("burgers")));

        let back = serde_json::to_value(&restaurant).unwrap();
        assert_eq!(back["cuisine"], json!("burgers"));
    }

    #[test]
    fn test_restaurant_minimal_record() {
        let restaurant: Restaurant = serde_json::from_value(json!({"name": "Taco Hut"})).unwrap();
        assert_eq!(restaurant, Restaurant::new("Taco Hut", ""));
    }
}

//! Waypoints and mission-plan validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A target coordinate plus altitude (metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

impl Waypoint {
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum WaypointError {
    #[error("A non-empty list of waypoints is required. Each waypoint needs lat, lon and alt keys.")]
    Empty,

    #[error("Waypoint {0} is missing required fields. Every waypoint must have lat, lon and alt.")]
    MissingField(usize),

    #[error("Waypoint {0} has a non-numeric {1} value.")]
    NotNumeric(usize, &'static str),
}

/// Validate a JSON mission plan. Every element must carry numeric `lat`, `lon` and `alt`.
pub fn parse_waypoints(value: &Value) -> Result<Vec<Waypoint>, WaypointError> {
    let items = match value.as_array() {
        Some(items) if !items.is_empty() => items,
        _ => return Err(WaypointError::Empty),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let field = |key: &'static str| -> Result<f64, WaypointError> {
                let v = item.get(key).ok_or(WaypointError::MissingField(i))?;
                v.as_f64().ok_or(WaypointError::NotNumeric(i, key))
            };
            Ok(Waypoint::new(field("lat")?, field("lon")?, field("alt")?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_plan() {
        let plan = json!([
            {"lat": 37.7749, "lon": -122.4194, "alt": 30},
            {"lat": 37.7750, "lon": -122.4195, "alt": 30.5}
        ]);
        let waypoints = parse_waypoints(&plan).unwrap();
        assert_eq!(waypoints.len(), 2);
        assert_eq!(waypoints[0], Waypoint::new(37.7749, -122.4194, 30.0));
        assert_eq!(waypoints[1].alt, 30.5);
    }

    #[test]
    fn test_missing_key_reports_index() {
        let plan = json!([
            {"lat": 1.0, "lon": 2.0, "alt": 10},
            {"lat": 1.0, "alt": 10}
        ]);
        assert_eq!(parse_waypoints(&plan), Err(WaypointError::MissingField(1)));
    }

    #[test]
    fn test_empty_or_wrong_shape() {
        assert_eq!(parse_waypoints(&json!([])), Err(WaypointError::Empty));
        assert_eq!(parse_waypoints(&json!({"lat": 1})), Err(WaypointError::Empty));
        assert_eq!(
            parse_waypoints(&json!([{"lat": "north", "lon": 2, "alt": 3}])),
            Err(WaypointError::NotNumeric(0, "lat"))
        );
    }
}

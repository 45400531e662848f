//! Great-circle helpers for radius searches.

use serde::{Deserialize, Serialize};

/// Earth radius in miles; a search distance divided by this is an angle in
/// radians.
pub const EARTH_RADIUS_MILES: f64 = 3963.0;

/// A longitude/latitude pair in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Read a GeoJSON `[lng, lat]` coordinate pair.
    pub fn from_coordinates(coords: &[serde_json::Value]) -> Option<Self> {
        match coords {
            [lng, lat] => Some(Self::new(lng.as_f64()?, lat.as_f64()?)),
            _ => None,
        }
    }

    /// Central angle between two points, in radians (haversine).
    pub fn angular_distance(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlng = (other.lng - self.lng).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * a.sqrt().min(1.0).asin()
    }
}

/// Convert a distance in miles to a search radius in radians.
pub fn radius_from_miles(distance: f64) -> f64 {
    distance / EARTH_RADIUS_MILES
}

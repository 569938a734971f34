//! Great-circle distance and unit conversion helpers.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by every distance in this crate.
pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const KM_TO_MILES: f64 = 0.621371;
pub const KM_TO_NAUTICAL_MILES: f64 = 0.539957;

/// A WGS84 position in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine_km(self.lat, self.lon, other.lat, other.lon)
    }

    /// East/north displacement in km of `self` relative to `origin`, using a
    /// local equirectangular projection around the origin's latitude.
    pub fn displacement_km(&self, origin: &Coordinate) -> (f64, f64) {
        let east = EARTH_RADIUS_KM
            * (self.lon - origin.lon).to_radians()
            * origin.lat.to_radians().cos();
        let north = EARTH_RADIUS_KM * (self.lat - origin.lat).to_radians();
        (east, north)
    }
}

/// Haversine distance in kilometres between two lat/lon pairs given in degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let to_rad = |deg: f64| deg.to_radians();
    let dlat = to_rad(lat2 - lat1);
    let dlon = to_rad(lon2 - lon1);
    let a = (dlat / 2.0).sin().powi(2)
        + to_rad(lat1).cos() * to_rad(lat2).cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal pairs.
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();
    EARTH_RADIUS_KM * c
}

pub fn km_to_miles(km: f64) -> f64 {
    km * KM_TO_MILES
}

pub fn km_to_nautical_miles(km: f64) -> f64 {
    km * KM_TO_NAUTICAL_MILES
}

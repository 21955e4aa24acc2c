// Coordinate model representing WGS84 positions

use crate::error::{DispatchError, Result};
use crate::models::Meters;
use geo::{HaversineDistance, Point};
use serde::{Deserialize, Serialize};

/// A WGS84 position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Creates a coordinate without range checks
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Creates a coordinate, rejecting non-finite or out-of-range degrees
    pub fn try_new(lat: f64, lon: f64) -> Result<Self> {
        let coordinate = Self { lat, lon };
        coordinate.validate()?;
        Ok(coordinate)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return Err(DispatchError::InvalidInput(format!(
                "non-finite coordinate ({}, {})",
                self.lat, self.lon
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(DispatchError::InvalidInput(format!(
                "coordinate ({}, {}) outside WGS84 bounds",
                self.lat, self.lon
            )));
        }
        Ok(())
    }

    /// Great-circle distance in meters
    pub fn haversine_distance(&self, other: &Coordinate) -> Meters {
        self.to_point().haversine_distance(&other.to_point())
    }

    /// Longitude-first pair, the order routing services and GeoJSON expect
    pub fn lon_lat(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    fn to_point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

//! Parking data delivered by parking offerings

use serde::{Deserialize, Serialize};

/// WGS84 position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Occupancy of a parking space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParkingSpaceStatus {
    Available,
    Occupied,
}

/// One parking space as reported by an offering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingResult {
    pub geo_coordinates: GeoCoordinates,

    /// Distance from the queried center, in meters
    pub distance: f64,

    pub status: ParkingSpaceStatus,
}

impl ParkingResult {
    pub fn is_available(&self) -> bool {
        self.status == ParkingSpaceStatus::Available
    }
}

/// Reduced view keeping only position and distance, read straight from
/// the offering's field names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeParking {
    #[serde(rename = "geoCoordinates")]
    pub coordinates: GeoCoordinates,

    #[serde(rename = "distance")]
    pub meters: f64,
}

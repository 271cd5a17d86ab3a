use serde::{Deserialize, Serialize};

use super::rounding::format_coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A named location as returned by the recognition service, best match first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkCandidate {
    pub name: String,
    pub score: f32,
    pub locations: Vec<GeoPoint>,
}

impl LandmarkCandidate {
    pub fn new(name: impl Into<String>, score: f32, locations: Vec<GeoPoint>) -> Self {
        Self {
            name: name.into(),
            score,
            locations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkResult {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl LandmarkResult {
    /// Picks the first candidate and its first location. A leading candidate
    /// without any location yields nothing.
    pub fn best_match(candidates: &[LandmarkCandidate]) -> Option<Self> {
        let candidate = candidates.first()?;
        let location = candidate.locations.first()?;
        Some(Self {
            name: candidate.name.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
        })
    }

    pub fn display_latitude(&self) -> String {
        format_coordinate(self.latitude)
    }

    pub fn display_longitude(&self) -> String {
        format_coordinate(self.longitude)
    }
}

//! Positions and distance calculations.
//!
//! Positions are in meters. The third axis defaults to zero so flat scenes can
//! leave it out of their JSON.

use serde::Deserialize;

/// Point in space, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub const fn new_3d(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared Euclidean distance. Enough for range comparisons that never
    /// need the actual distance.
    pub fn distance2(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        self.distance2(other).sqrt()
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Geographic position as reported by the device or stored remotely.

use geo::{Coord, Point};
use serde::{Deserialize, Serialize};

/// A WGS84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether the coordinates are finite and within WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

// geo uses x = longitude, y = latitude.
impl From<Position> for Coord<f64> {
    fn from(p: Position) -> Self {
        Coord {
            x: p.longitude,
            y: p.latitude,
        }
    }
}

impl From<Position> for Point<f64> {
    fn from(p: Position) -> Self {
        Point::new(p.longitude, p.latitude)
    }
}

impl From<Coord<f64>> for Position {
    fn from(c: Coord<f64>) -> Self {
        Position::new(c.y, c.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_axis_order() {
        let bogota = Position::new(4.60, -74.08);
        let coord: Coord<f64> = bogota.into();
        assert_eq!(coord.x, -74.08);
        assert_eq!(coord.y, 4.60);
        assert_eq!(Position::from(coord), bogota);
    }

    #[test]
    fn test_is_valid() {
        assert!(Position::new(4.60, -74.08).is_valid());
        assert!(!Position::new(91.0, 0.0).is_valid());
        assert!(!Position::new(0.0, f64::NAN).is_valid());
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Travel trail with consecutive-duplicate suppression.

use crate::models::Position;
use geo::{Coord, Distance, Haversine, LineString, Point};

/// Encoded polyline precision (Google format).
const POLYLINE_PRECISION: u32 = 5;

/// Ordered points of a trail. Never holds two equal consecutive points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathTrail {
    points: Vec<Position>,
}

impl PathTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `point` unless it equals the last one. Returns whether it was appended.
    pub fn push(&mut self, point: Position) -> bool {
        if self.points.last() == Some(&point) {
            return false;
        }
        self.points.push(point);
        true
    }

    pub fn last(&self) -> Option<Position> {
        self.points.last().copied()
    }

    pub fn points(&self) -> &[Position] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn line_string(&self) -> LineString<f64> {
        self.points.iter().map(|p| Coord::from(*p)).collect()
    }

    /// Great-circle length of the trail in metres.
    pub fn length_meters(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| Haversine.distance(Point::from(w[0]), Point::from(w[1])))
            .sum()
    }

    /// Encoded polyline, or `None` if a point cannot be encoded.
    pub fn encoded(&self) -> Option<String> {
        match polyline::encode_coordinates(self.line_string(), POLYLINE_PRECISION) {
            Ok(encoded) => Some(encoded),
            Err(e) => {
                tracing::warn!(error = %e, points = self.points.len(), "Failed to encode trail");
                None
            }
        }
    }
}

impl FromIterator<Position> for PathTrail {
    fn from_iter<I: IntoIterator<Item = Position>>(iter: I) -> Self {
        let mut trail = PathTrail::new();
        for p in iter {
            trail.push(p);
        }
        trail
    }
}

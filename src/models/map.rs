// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Render model handed to the external map renderer.

use crate::models::Position;
use serde::{Deserialize, Serialize};

/// Zoom level used when following the local device.
pub const FOLLOW_ZOOM: f32 = 16.0;
/// Camera animation duration when following the local device.
pub const FOLLOW_DURATION_MS: u32 = 1000;

/// A pin on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub position: Position,
    pub title: String,
    pub snippet: String,
}

/// A travel trail drawn as a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Polyline {
    /// Owner of the trail (local uid or remote uid)
    pub uid: String,
    pub points: Vec<Position>,
    /// Same points in encoded polyline format (precision 5)
    pub encoded: String,
    /// ARGB color, e.g. `0xFF1E88E5`
    pub color: u32,
    /// Stroke width in pixels
    pub width: f32,
    /// Haversine length of the trail in metres
    pub length_meters: f64,
}

/// Animated camera move requested from the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraMove {
    pub position: Position,
    pub zoom: f32,
    pub duration_ms: u32,
}

impl CameraMove {
    /// Follow the local device at the standard zoom.
    pub fn follow(position: Position) -> Self {
        Self {
            position,
            zoom: FOLLOW_ZOOM,
            duration_ms: FOLLOW_DURATION_MS,
        }
    }
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFrame {
    pub markers: Vec<Marker>,
    pub polylines: Vec<Polyline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraMove>,
}

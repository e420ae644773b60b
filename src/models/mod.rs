// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod map;
pub mod position;
pub mod user;

pub use map::{CameraMove, MapFrame, Marker, Polyline};
pub use position::Position;
pub use user::{PresenceUpdate, ProfileUpdate, User};

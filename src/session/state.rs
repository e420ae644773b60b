// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session state and its transition functions.
//!
//! Pure data: no I/O, no clocks. The session actor is the only writer.

use crate::models::{CameraMove, MapFrame, Marker, Polyline, Position, User};
use crate::session::path::PathTrail;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Color of the local trail (ARGB).
const LOCAL_TRAIL_COLOR: u32 = 0xFF1E_88E5;
/// Colors cycled through for remote trails (ARGB).
const REMOTE_TRAIL_COLORS: [u32; 6] = [
    0xFFE5_3935,
    0xFF43_A047,
    0xFFFB_8C00,
    0xFF8E_24AA,
    0xFF00_ACC1,
    0xFF6D_4C41,
];
const LOCAL_TRAIL_WIDTH: f32 = 8.0;
const REMOTE_TRAIL_WIDTH: f32 = 6.0;

/// What the session is doing, as shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Toggle off
    #[default]
    Idle,
    /// Toggle on, no position available yet
    WaitingForPosition,
    /// Toggle on, broadcasting
    Tracking,
    /// Toggle on, but the user refused location access
    PermissionDenied,
}

/// Result of feeding a local fix into the state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalFix {
    /// New trail point; must be published.
    Appended(Position),
    /// Same as the previous point; nothing to publish.
    Unchanged,
    /// Session not connected; fix discarded.
    Ignored,
}

/// Owned state of one location-sharing session.
#[derive(Debug, Clone)]
pub struct SessionState {
    uid: String,
    fanout: usize,
    is_connected: bool,
    status: SessionStatus,
    last_known_position: Option<Position>,
    local_path: PathTrail,
    remote_paths: HashMap<String, PathTrail>,
    remote_users: Vec<User>,
    last_error: Option<String>,
}

impl SessionState {
    pub fn new(uid: impl Into<String>, fanout: usize) -> Self {
        Self {
            uid: uid.into(),
            fanout,
            is_connected: false,
            status: SessionStatus::Idle,
            last_known_position: None,
            local_path: PathTrail::new(),
            remote_paths: HashMap::new(),
            remote_users: Vec::new(),
            last_error: None,
        }
    }

    // ─── Transitions ─────────────────────────────────────────────

    /// Toggle on. Returns `false` if already connected.
    pub fn connect(&mut self) -> bool {
        if self.is_connected {
            return false;
        }
        self.is_connected = true;
        self.status = SessionStatus::WaitingForPosition;
        self.last_error = None;
        true
    }

    /// Toggle off, dropping every trail and remote user. Returns `false` if
    /// already disconnected.
    pub fn disconnect(&mut self) -> bool {
        if !self.is_connected {
            return false;
        }
        self.is_connected = false;
        self.status = SessionStatus::Idle;
        self.local_path.clear();
        self.remote_paths.clear();
        self.remote_users.clear();
        true
    }

    /// Feed a position read by the poller.
    pub fn observe_local(&mut self, position: Position) -> LocalFix {
        if !self.is_connected {
            return LocalFix::Ignored;
        }
        self.last_known_position = Some(position);
        self.status = SessionStatus::Tracking;
        if self.local_path.push(position) {
            LocalFix::Appended(position)
        } else {
            LocalFix::Unchanged
        }
    }

    /// The poller found no fix.
    pub fn observe_no_fix(&mut self) {
        if self.is_connected && self.local_path.is_empty() {
            self.status = SessionStatus::WaitingForPosition;
        }
    }

    /// The poller was refused location access.
    pub fn observe_permission_denied(&mut self) {
        if self.is_connected {
            self.status = SessionStatus::PermissionDenied;
        }
    }

    /// Replace the remote user set with a pushed snapshot.
    ///
    /// The snapshot is cut to the fanout cap in the order delivered, then the
    /// local user and anyone not marked connected are removed. Trails of users
    /// absent from the snapshot are deleted.
    pub fn apply_remote(&mut self, snapshot: Vec<User>) {
        if !self.is_connected {
            return;
        }

        let users: Vec<User> = snapshot
            .into_iter()
            .take(self.fanout)
            .filter(|u| u.is_connected && u.uid != self.uid)
            .collect();

        let present: HashSet<&str> = users.iter().map(|u| u.uid.as_str()).collect();
        self.remote_paths
            .retain(|uid, _| present.contains(uid.as_str()));

        for user in &users {
            self.remote_paths
                .entry(user.uid.clone())
                .or_default()
                .push(user.position());
        }

        self.remote_users = users;
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    // ─── Accessors ───────────────────────────────────────────────

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn last_known_position(&self) -> Option<Position> {
        self.last_known_position
    }

    pub fn local_path(&self) -> &PathTrail {
        &self.local_path
    }

    pub fn remote_path(&self, uid: &str) -> Option<&PathTrail> {
        self.remote_paths.get(uid)
    }

    pub fn remote_users(&self) -> &[User] {
        &self.remote_users
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ─── Rendering ───────────────────────────────────────────────

    /// Snapshot for the presentation layer.
    pub fn view(&self) -> SessionView {
        SessionView {
            uid: self.uid.clone(),
            connected: self.is_connected,
            status: self.status,
            last_known_position: self.last_known_position,
            local_path: self.local_path.points().to_vec(),
            remote_paths: self
                .remote_paths
                .iter()
                .map(|(uid, trail)| (uid.clone(), trail.points().to_vec()))
                .collect(),
            remote_users: self.remote_users.clone(),
            last_error: self.last_error.clone(),
            frame: self.map_frame(),
        }
    }

    /// Markers, trails and camera move for the map renderer.
    pub fn map_frame(&self) -> MapFrame {
        let mut markers = Vec::with_capacity(self.remote_users.len() + 1);
        if let Some(position) = self.last_known_position {
            markers.push(Marker {
                position,
                title: "My location".to_string(),
                snippet: "You are here".to_string(),
            });
        }
        markers.extend(self.remote_users.iter().map(|u| Marker {
            position: u.position(),
            title: if u.name.is_empty() {
                u.email.clone()
            } else {
                u.name.clone()
            },
            snippet: u.email.clone(),
        }));

        let mut polylines = Vec::new();
        if let Some(line) = polyline_for(
            &self.uid,
            &self.local_path,
            LOCAL_TRAIL_COLOR,
            LOCAL_TRAIL_WIDTH,
        ) {
            polylines.push(line);
        }
        for user in &self.remote_users {
            if let Some(trail) = self.remote_paths.get(&user.uid) {
                let color = remote_color(&user.uid);
                if let Some(line) = polyline_for(&user.uid, trail, color, REMOTE_TRAIL_WIDTH) {
                    polylines.push(line);
                }
            }
        }

        MapFrame {
            markers,
            polylines,
            camera: self
                .last_known_position
                .filter(|_| self.is_connected)
                .map(CameraMove::follow),
        }
    }
}

/// A trail needs two points to be drawn.
fn polyline_for(uid: &str, trail: &PathTrail, color: u32, width: f32) -> Option<Polyline> {
    if trail.len() < 2 {
        return None;
    }
    Some(Polyline {
        uid: uid.to_string(),
        points: trail.points().to_vec(),
        encoded: trail.encoded().unwrap_or_default(),
        color,
        width,
        length_meters: trail.length_meters(),
    })
}

/// Stable color per uid, independent of snapshot order.
fn remote_color(uid: &str) -> u32 {
    let sum = uid.bytes().fold(0usize, |acc, b| acc.wrapping_add(b as usize));
    REMOTE_TRAIL_COLORS[sum % REMOTE_TRAIL_COLORS.len()]
}

/// Published snapshot of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub uid: String,
    pub connected: bool,
    pub status: SessionStatus,
    pub last_known_position: Option<Position>,
    pub local_path: Vec<Position>,
    pub remote_paths: BTreeMap<String, Vec<Position>>,
    pub remote_users: Vec<User>,
    pub last_error: Option<String>,
    pub frame: MapFrame,
}

//! User model for storage and API.

use crate::models::Position;
use serde::{Deserialize, Serialize};

/// User profile and presence, stored in Firestore at `users/{uid}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    /// Identity-service uid (also used as document ID)
    pub uid: String,
    /// Display name
    pub name: String,
    /// National identification number
    pub id_number: String,
    pub email: String,
    pub phone: String,
    /// Last published latitude
    pub latitude: f64,
    /// Last published longitude
    pub longitude: f64,
    /// Whether the user is currently broadcasting their location
    pub is_connected: bool,
    /// Download URL of the profile photo (empty when none)
    pub photo_url: String,
}

impl User {
    /// Last published position.
    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude)
    }
}

/// Partial write of a user's presence fields.
///
/// Only the fields named by [`PresenceUpdate::field_paths`] are written, so a
/// disconnect leaves the last published position in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub is_connected: bool,
}

impl PresenceUpdate {
    pub fn connected_at(position: Position) -> Self {
        Self {
            latitude: Some(position.latitude),
            longitude: Some(position.longitude),
            is_connected: true,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            latitude: None,
            longitude: None,
            is_connected: false,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Position::new(lat, lon)),
            _ => None,
        }
    }

    /// Document field paths covered by this update.
    pub fn field_paths(&self) -> Vec<&'static str> {
        if self.position().is_some() {
            vec!["latitude", "longitude", "isConnected"]
        } else {
            vec!["isConnected"]
        }
    }

    /// Apply this update to a locally held user record.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(p) = self.position() {
            user.latitude = p.latitude;
            user.longitude = p.longitude;
        }
        user.is_connected = self.is_connected;
    }
}

/// Partial write of the editable profile fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: String,
    pub id_number: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl ProfileUpdate {
    /// Document field paths covered by this update.
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut paths = vec!["name", "idNumber", "phone"];
        if self.photo_url.is_some() {
            paths.push("photoUrl");
        }
        paths
    }

    pub fn apply_to(&self, user: &mut User) {
        user.name = self.name.clone();
        user.id_number = self.id_number.clone();
        user.phone = self.phone.clone();
        if let Some(url) = &self.photo_url {
            user.photo_url = url.clone();
        }
    }
}

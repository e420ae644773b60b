// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Position source fed by the presentation layer.
//!
//! The device's positioning service lives outside this crate. The UI reports
//! each fix and the permission decision here; the session's poller then
//! reads the last known value.

use crate::error::AppError;
use crate::models::Position;
use crate::platform::PositionSource;
use async_trait::async_trait;
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Reported {
    permission_denied: bool,
    last: Option<Position>,
}

/// Last reported fix and permission state.
#[derive(Debug, Default)]
pub struct ReportedPosition {
    inner: RwLock<Reported>,
}

impl ReportedPosition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new fix. Invalid coordinates are rejected.
    pub fn report(&self, position: Position) -> Result<(), AppError> {
        if !position.is_valid() {
            return Err(AppError::BadRequest(format!(
                "Invalid coordinates: {}, {}",
                position.latitude, position.longitude
            )));
        }
        let mut inner = self.inner.write().unwrap_or_else(|p| p.into_inner());
        inner.last = Some(position);
        // A fix implies access was granted.
        inner.permission_denied = false;
        Ok(())
    }

    /// Record the user's answer to the location permission prompt.
    pub fn set_permission(&self, granted: bool) {
        let mut inner = self.inner.write().unwrap_or_else(|p| p.into_inner());
        inner.permission_denied = !granted;
        if !granted {
            inner.last = None;
        }
        tracing::info!(granted, "Location permission reported");
    }
}

#[async_trait]
impl PositionSource for ReportedPosition {
    async fn last_known_position(&self) -> Result<Option<Position>, AppError> {
        let inner = self.inner.read().unwrap_or_else(|p| p.into_inner());
        if inner.permission_denied {
            return Err(AppError::PermissionDenied);
        }
        Ok(inner.last)
    }
}

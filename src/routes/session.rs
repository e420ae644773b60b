// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map screen routes: device position reports and the sharing toggle.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::Position;
use crate::session::{LocationSession, SessionHandle, SessionView};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/location", post(report_location))
        .route("/api/location/permission", post(report_permission))
        .route(
            "/api/session",
            get(get_session).put(set_connected).delete(leave_session),
        )
}

#[derive(Deserialize)]
pub struct PermissionRequest {
    granted: bool,
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    connected: bool,
}

/// Fix from the device's positioning service.
async fn report_location(
    State(state): State<Arc<AppState>>,
    Json(position): Json<Position>,
) -> Result<StatusCode> {
    state.positions.report(position)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn report_permission(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PermissionRequest>,
) -> StatusCode {
    state.positions.set_permission(body.granted);
    StatusCode::NO_CONTENT
}

/// Current view of the map screen, opening the session on first use.
async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<SessionView> {
    let mut slot = state.session.lock().await;
    Json(open_session(&state, &mut slot, &user.uid).await.view())
}

async fn set_connected(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ToggleRequest>,
) -> Result<Json<SessionView>> {
    let mut slot = state.session.lock().await;
    let session = open_session(&state, &mut slot, &user.uid).await;
    Ok(Json(session.set_connected(body.connected).await?))
}

/// The map screen was left: end the session.
async fn leave_session(State(state): State<Arc<AppState>>) -> StatusCode {
    close_session(&state).await;
    StatusCode::NO_CONTENT
}

/// Session for `uid`, replacing one left open by another user.
async fn open_session<'a>(
    state: &AppState,
    slot: &'a mut Option<SessionHandle>,
    uid: &str,
) -> &'a SessionHandle {
    if slot.as_ref().is_some_and(|s| s.uid() != uid) {
        if let Some(stale) = slot.take() {
            stale.shutdown().await;
        }
    }

    slot.get_or_insert_with(|| {
        LocationSession::start(
            uid,
            state.session_deps.clone(),
            state.session_settings,
        )
    })
}

/// End the open session, if any, waiting for its disconnect to be written.
pub async fn close_session(state: &AppState) {
    let session = state.session.lock().await.take();
    if let Some(session) = session {
        session.shutdown().await;
    }
}

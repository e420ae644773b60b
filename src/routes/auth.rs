// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration, sign-in and sign-out routes.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::models::User;
use crate::routes::session::close_session;
use crate::services::Registration;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

/// Signed-in identity returned to the client.
#[derive(Serialize)]
pub struct LoginResponse {
    pub uid: String,
    pub email: String,
}

/// Create an account and its user document. The new user stays signed in.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(form): Json<Registration>,
) -> Result<(StatusCode, Json<User>)> {
    let user = state.accounts.register(&form).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    // A different user may still have a map open.
    close_session(&state).await;

    let session = state.accounts.login(&body.email, &body.password).await?;
    Ok(Json(LoginResponse {
        uid: session.uid,
        email: session.email,
    }))
}

/// End any open session (publishing the disconnect) before signing out.
async fn logout(State(state): State<Arc<AppState>>) -> StatusCode {
    close_session(&state).await;
    state.accounts.logout().await;
    StatusCode::NO_CONTENT
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes for the signed-in user.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::User;
use crate::services::{PhotoUpload, ProfileEdit};
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/profile", get(get_profile).put(update_profile))
}

/// Photo sent inline as base64.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoBody {
    content_type: String,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    name: String,
    id_number: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    photo: Option<PhotoBody>,
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>> {
    Ok(Json(state.profiles.load(&user.uid).await?))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<User>> {
    let photo = match body.photo {
        Some(photo) => Some(PhotoUpload {
            bytes: BASE64
                .decode(photo.data.trim())
                .map_err(|e| AppError::BadRequest(format!("Photo is not valid base64: {}", e)))?,
            content_type: photo.content_type,
        }),
        None => None,
    };

    let edit = ProfileEdit {
        name: body.name,
        id_number: body.id_number,
        phone: body.phone,
        password: body.password,
        photo,
    };

    Ok(Json(state.profiles.update(&user.uid, edit).await?))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile loading and editing.

use crate::error::{AppError, Result};
use crate::models::{ProfileUpdate, User};
use crate::platform::{BlobStore, IdentityProvider, UserStore};
use crate::services::account::validation_message;
use crate::services::storage::profile_photo_path;
use std::sync::Arc;
use validator::Validate;

/// Largest accepted profile photo.
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// New profile photo.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Edit form for the signed-in user's profile.
#[derive(Debug, Clone, Validate)]
pub struct ProfileEdit {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 30, message = "ID number is required"))]
    pub id_number: String,
    #[validate(length(max = 30, message = "Phone number is too long"))]
    pub phone: String,
    /// New password; blank means unchanged
    pub password: Option<String>,
    pub photo: Option<PhotoUpload>,
}

/// Reads and edits `users/{uid}`, the profile photo and the password.
#[derive(Clone)]
pub struct ProfileService {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn UserStore>,
    blobs: Arc<dyn BlobStore>,
}

impl ProfileService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn UserStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            identity,
            store,
            blobs,
        }
    }

    pub async fn load(&self, uid: &str) -> Result<User> {
        tracing::debug!(uid, "Loading profile");
        self.store.get_user(uid).await?.ok_or_else(|| {
            tracing::warn!(uid, "No user document");
            AppError::NotFound(format!("User {} not found", uid))
        })
    }

    /// Apply an edit: photo upload, document update, then password change.
    ///
    /// Each step stops the edit on failure; a failed password change is
    /// reported even though the document was already updated.
    pub async fn update(&self, uid: &str, edit: ProfileEdit) -> Result<User> {
        let edit = ProfileEdit {
            name: edit.name.trim().to_string(),
            id_number: edit.id_number.trim().to_string(),
            phone: edit.phone.trim().to_string(),
            ..edit
        };
        edit.validate()
            .map_err(|e| AppError::BadRequest(validation_message(&e)))?;

        let new_password = edit
            .password
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());
        if new_password.is_some_and(|p| p.len() < 6) {
            return Err(AppError::BadRequest(
                "Password must be at least 6 characters".to_string(),
            ));
        }

        let photo_url = match edit.photo {
            Some(photo) => Some(self.store_photo(uid, photo).await?),
            None => None,
        };

        let update = ProfileUpdate {
            name: edit.name,
            id_number: edit.id_number,
            phone: edit.phone,
            photo_url,
        };
        self.store.update_profile(uid, &update).await?;
        tracing::info!(uid, photo = update.photo_url.is_some(), "Profile updated");

        if let Some(password) = new_password {
            self.identity.update_password(password).await?;
        }

        let mut user = self.load(uid).await?;
        // The store may lag behind our own write.
        update.apply_to(&mut user);
        Ok(user)
    }

    async fn store_photo(&self, uid: &str, photo: PhotoUpload) -> Result<String> {
        if photo.bytes.is_empty() {
            return Err(AppError::BadRequest("Photo is empty".to_string()));
        }
        if photo.bytes.len() > MAX_PHOTO_BYTES {
            return Err(AppError::BadRequest("Photo is too large".to_string()));
        }
        if !photo.content_type.starts_with("image/") {
            return Err(AppError::BadRequest(format!(
                "Unsupported photo type: {}",
                photo.content_type
            )));
        }

        let path = profile_photo_path(uid);
        self.blobs
            .upload(&path, photo.bytes, &photo.content_type)
            .await?;
        self.blobs.download_url(&path).await
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Storage client (REST API) for profile photos.

use crate::error::AppError;
use crate::platform::{BlobStore, IdentityProvider};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

const FIREBASE_STORAGE_URL: &str = "https://firebasestorage.googleapis.com";

/// Object path for a user's profile photo.
pub fn profile_photo_path(uid: &str) -> String {
    format!("profile_photos/{}.jpg", uid)
}

/// Storage client authenticating as the signed-in user.
pub struct FirebaseStorageClient {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    identity: Arc<dyn IdentityProvider>,
}

impl FirebaseStorageClient {
    /// For local development with the Storage emulator, set FIREBASE_STORAGE_EMULATOR_HOST.
    pub fn new(bucket: String, identity: Arc<dyn IdentityProvider>) -> Self {
        let base_url = match std::env::var("FIREBASE_STORAGE_EMULATOR_HOST") {
            Ok(host) => format!("http://{}", host),
            Err(_) => FIREBASE_STORAGE_URL.to_string(),
        };
        Self {
            http: reqwest::Client::new(),
            base_url,
            bucket,
            identity,
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/v0/b/{}/o/{}",
            self.base_url,
            self.bucket,
            urlencoding::encode(path)
        )
    }

    fn id_token(&self) -> Result<String, AppError> {
        self.identity
            .current_user()
            .map(|s| s.id_token)
            .ok_or(AppError::Unauthorized)
    }

    /// Check response and parse object metadata.
    async fn check_metadata(&self, response: reqwest::Response) -> Result<ObjectMetadata, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 404 {
                return Err(AppError::NotFound("Object does not exist".to_string()));
            }
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(AppError::Storage(
                    "Not allowed to access this file".to_string(),
                ));
            }
            return Err(AppError::Storage(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl BlobStore for FirebaseStorageClient {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        let size = bytes.len();
        let response = self
            .http
            .post(format!("{}/v0/b/{}/o", self.base_url, self.bucket))
            .query(&[("uploadType", "media"), ("name", path)])
            .bearer_auth(self.id_token()?)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let meta = self.check_metadata(response).await?;
        tracing::info!(path, size, object = %meta.name, "Uploaded object");
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String, AppError> {
        let object_url = self.object_url(path);
        let response = self
            .http
            .get(&object_url)
            .bearer_auth(self.id_token()?)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let meta = self.check_metadata(response).await?;
        let token = meta
            .download_token()
            .ok_or_else(|| AppError::Storage("Object has no download token".to_string()))?;

        Ok(format!("{}?alt=media&token={}", object_url, token))
    }
}

/// Subset of the object metadata returned by Firebase Storage.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    name: String,
    /// Comma-separated list of download tokens
    #[serde(default)]
    download_tokens: Option<String>,
}

impl ObjectMetadata {
    fn download_token(&self) -> Option<&str> {
        self.download_tokens
            .as_deref()
            .and_then(|t| t.split(',').map(str::trim).find(|t| !t.is_empty()))
    }
}

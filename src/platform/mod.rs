// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Capability traits for the cloud platform and the device.
//!
//! Services receive these as `Arc<dyn ...>` handles so the concrete
//! Firebase/Firestore adapters can be swapped for in-memory fakes.

use crate::error::Result;
use crate::models::{Position, PresenceUpdate, ProfileUpdate, User};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub uid: String,
    pub email: String,
    /// Bearer token for platform calls made on the user's behalf
    pub id_token: String,
}

/// Identity service (account creation, password sign-in).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and sign it in.
    async fn create_account(&self, email: &str, password: &str) -> Result<AuthSession>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;

    /// Forget the current credentials. Never fails.
    async fn sign_out(&self);

    /// Change the password of the signed-in user.
    async fn update_password(&self, new_password: &str) -> Result<()>;

    fn current_user(&self) -> Option<AuthSession>;
}

/// Document store holding the `users` collection.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, uid: &str) -> Result<Option<User>>;

    /// Create or overwrite a whole user document.
    async fn set_user(&self, user: &User) -> Result<()>;

    async fn update_profile(&self, uid: &str, update: &ProfileUpdate) -> Result<()>;

    async fn update_presence(&self, uid: &str, update: &PresenceUpdate) -> Result<()>;

    /// Open a live query on connected users, at most `limit` per snapshot.
    async fn watch_connected(&self, limit: u32) -> Result<PresenceFeed>;
}

/// Object storage for profile photos.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    async fn download_url(&self, path: &str) -> Result<String>;
}

/// Device positioning.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Best-effort last known fix; `Ok(None)` when no fix exists yet.
    ///
    /// Returns [`crate::error::AppError::PermissionDenied`] when the user
    /// refused location access.
    async fn last_known_position(&self) -> Result<Option<Position>>;
}

/// Push stream of connected-user snapshots with explicit unsubscribe.
///
/// Dropping the feed also releases the subscription.
pub struct PresenceFeed {
    updates: mpsc::Receiver<Vec<User>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PresenceFeed {
    /// Wrap a snapshot channel; `cancel` is triggered on close.
    pub fn new(updates: mpsc::Receiver<Vec<User>>, cancel: CancellationToken) -> Self {
        Self {
            updates,
            cancel,
            task: None,
        }
    }

    /// Attach the task producing snapshots so `close` can wait for it.
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    /// Next snapshot, or `None` once the platform side has gone away.
    pub async fn next(&mut self) -> Option<Vec<User>> {
        self.updates.recv().await
    }

    /// Unsubscribe and wait for the producer to finish.
    pub async fn close(mut self) {
        self.cancel.cancel();
        self.updates.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Presence feed task ended abnormally");
            }
        }
    }
}

impl Drop for PresenceFeed {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

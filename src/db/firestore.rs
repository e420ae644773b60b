// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides:
//! - User documents (profile and presence fields)
//! - A live query over connected users, folded into full snapshots

use crate::db::collections;
use crate::error::AppError;
use crate::models::{PresenceUpdate, ProfileUpdate, User};
use crate::platform::{PresenceFeed, UserStore};
use async_trait::async_trait;
use firestore::{
    FirestoreListenEvent, FirestoreListener, FirestoreListenerTarget,
    FirestoreMemListenStateStorage,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Listener target id for the connected-users query.
const CONNECTED_USERS_TARGET: FirestoreListenerTarget = FirestoreListenerTarget::new(17_u32);
/// Buffered snapshots before the listener applies backpressure.
const FEED_BUFFER: usize = 16;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }
}

#[async_trait]
impl UserStore for FirestoreDb {
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update_profile(&self, uid: &str, update: &ProfileUpdate) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(update.field_paths())
            .in_col(collections::USERS)
            .document_id(uid)
            .object(update)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update_presence(&self, uid: &str, update: &PresenceUpdate) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(update.field_paths())
            .in_col(collections::USERS)
            .document_id(uid)
            .object(update)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(uid, connected = update.is_connected, "Presence written");
        Ok(())
    }

    /// Listen to `users` where `isConnected == true`, limited to `limit`.
    ///
    /// Firestore pushes per-document changes; they are folded into a full
    /// snapshot (platform order preserved) and one snapshot is emitted per
    /// change.
    async fn watch_connected(&self, limit: u32) -> Result<PresenceFeed, AppError> {
        let client = self.get_client()?.clone();

        let mut listener = client
            .create_listener(FirestoreMemListenStateStorage::new())
            .await
            .map_err(|e| AppError::Database(format!("Failed to create listener: {}", e)))?;

        client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.for_all([q.field("isConnected").eq(true)]))
            .limit(limit)
            .listen()
            .add_target(CONNECTED_USERS_TARGET, &mut listener)
            .map_err(|e| AppError::Database(format!("Failed to add listen target: {}", e)))?;

        let (event_tx, event_rx) = mpsc::unbounded_channel::<FirestoreListenEvent>();
        listener
            .start(move |event| {
                let event_tx = event_tx.clone();
                async move {
                    // Receiver gone means the feed was closed; the listener is
                    // shut down right after.
                    let _ = event_tx.send(event);
                    Ok(())
                }
            })
            .await
            .map_err(|e| AppError::Database(format!("Failed to start listener: {}", e)))?;

        let (snapshot_tx, snapshot_rx) = mpsc::channel(FEED_BUFFER);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(fold_connected_users(
            event_rx,
            snapshot_tx,
            cancel.clone(),
            listener,
        ));

        tracing::info!(limit, "Subscribed to connected users");
        Ok(PresenceFeed::new(snapshot_rx, cancel).with_task(task))
    }
}

/// Fold listen events into snapshots until cancelled, then shut the listener down.
async fn fold_connected_users(
    mut events: mpsc::UnboundedReceiver<FirestoreListenEvent>,
    snapshots: mpsc::Sender<Vec<User>>,
    cancel: CancellationToken,
    mut listener: FirestoreListener<firestore::FirestoreDb, FirestoreMemListenStateStorage>,
) {
    let mut snapshot = ConnectedSnapshot::default();

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let changed = match event {
            FirestoreListenEvent::DocumentChange(change) => match change.document {
                Some(doc) => match firestore::FirestoreDb::deserialize_doc_to::<User>(&doc) {
                    Ok(mut user) => {
                        let id = document_id(&doc.name);
                        if user.uid.is_empty() {
                            user.uid = id.to_string();
                        }
                        snapshot.upsert(user)
                    }
                    Err(e) => {
                        tracing::warn!(doc = %doc.name, error = %e, "Skipping malformed user document");
                        false
                    }
                },
                None => false,
            },
            FirestoreListenEvent::DocumentDelete(delete) => {
                snapshot.remove(document_id(&delete.document))
            }
            FirestoreListenEvent::DocumentRemove(remove) => {
                snapshot.remove(document_id(&remove.document))
            }
            _ => false,
        };

        if changed && snapshots.send(snapshot.users.clone()).await.is_err() {
            break;
        }
    }

    if let Err(e) = listener.shutdown().await {
        tracing::warn!(error = %e, "Failed to shut down Firestore listener");
    }
    tracing::info!("Unsubscribed from connected users");
}

/// Last path segment of a full document name.
fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Connected users in the order the platform first reported them.
#[derive(Debug, Default)]
struct ConnectedSnapshot {
    users: Vec<User>,
}

impl ConnectedSnapshot {
    /// Insert or replace; a user no longer marked connected is dropped.
    fn upsert(&mut self, user: User) -> bool {
        if !user.is_connected {
            return self.remove(&user.uid.clone());
        }
        match self.users.iter_mut().find(|u| u.uid == user.uid) {
            Some(existing) if *existing == user => false,
            Some(existing) => {
                *existing = user;
                true
            }
            None => {
                self.users.push(user);
                true
            }
        }
    }

    fn remove(&mut self, uid: &str) -> bool {
        let before = self.users.len();
        self.users.retain(|u| u.uid != uid);
        self.users.len() != before
    }
}

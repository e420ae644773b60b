// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory platform fakes and app builders shared by integration tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use trailshare::config::Config;
use trailshare::db::FirestoreDb;
use trailshare::error::{AppError, Result};
use trailshare::models::{Position, PresenceUpdate, ProfileUpdate, User};
use trailshare::platform::{
    AuthSession, BlobStore, IdentityProvider, PositionSource, PresenceFeed, UserStore,
};
use trailshare::routes::create_router;
use trailshare::services::ReportedPosition;
use trailshare::session::{RetryPolicy, SessionDeps, SessionSettings};
use trailshare::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

// ═══════════════════════════════════════════════════════════════════════════
// USER STORE
// ═══════════════════════════════════════════════════════════════════════════

struct Subscription {
    limit: u32,
    sender: mpsc::Sender<Vec<User>>,
    cancel: CancellationToken,
}

/// `users` collection in memory. Connected-user snapshots are pushed by the
/// test with [`MemoryUserStore::push`].
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, User>>,
    presence_writes: Mutex<Vec<(String, PresenceUpdate)>>,
    presence_failures: AtomicU32,
    subscriptions: Mutex<Vec<Subscription>>,
    fail_subscribe: Mutex<Option<String>>,
}

#[allow(dead_code)]
impl MemoryUserStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().insert(user.uid.clone(), user);
    }

    pub fn user(&self, uid: &str) -> Option<User> {
        self.users.lock().unwrap().get(uid).cloned()
    }

    /// Every presence write, in the order it reached the store.
    pub fn presence_writes(&self) -> Vec<(String, PresenceUpdate)> {
        self.presence_writes.lock().unwrap().clone()
    }

    pub fn disconnect_writes(&self, uid: &str) -> usize {
        self.presence_writes()
            .iter()
            .filter(|(u, w)| u == uid && !w.is_connected)
            .count()
    }

    /// Fail the next `n` presence writes.
    pub fn fail_presence_writes(&self, n: u32) {
        self.presence_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_subscriptions(&self, message: &str) {
        *self.fail_subscribe.lock().unwrap() = Some(message.to_string());
    }

    /// Subscriptions not yet released by their owner.
    pub fn open_subscriptions(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| !s.cancel.is_cancelled())
            .count()
    }

    pub fn subscription_limits(&self) -> Vec<u32> {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.limit)
            .collect()
    }

    /// Deliver a snapshot to every open subscription.
    pub async fn push(&self, users: Vec<User>) {
        let senders: Vec<_> = self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| !s.cancel.is_cancelled())
            .map(|s| s.sender.clone())
            .collect();
        for sender in senders {
            let _ = sender.send(users.clone()).await;
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_user(&self, uid: &str) -> Result<Option<User>> {
        Ok(self.user(uid))
    }

    async fn set_user(&self, user: &User) -> Result<()> {
        self.insert(user.clone());
        Ok(())
    }

    async fn update_profile(&self, uid: &str, update: &ProfileUpdate) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(uid)
            .ok_or_else(|| AppError::Database(format!("No document users/{}", uid)))?;
        update.apply_to(user);
        Ok(())
    }

    async fn update_presence(&self, uid: &str, update: &PresenceUpdate) -> Result<()> {
        let failing = self
            .presence_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AppError::Database("unavailable".to_string()));
        }

        self.presence_writes
            .lock()
            .unwrap()
            .push((uid.to_string(), *update));
        let mut users = self.users.lock().unwrap();
        let user = users.entry(uid.to_string()).or_insert_with(|| User {
            uid: uid.to_string(),
            ..Default::default()
        });
        update.apply_to(user);
        Ok(())
    }

    async fn watch_connected(&self, limit: u32) -> Result<PresenceFeed> {
        if let Some(message) = self.fail_subscribe.lock().unwrap().clone() {
            return Err(AppError::Database(message));
        }
        let (sender, receiver) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        self.subscriptions.lock().unwrap().push(Subscription {
            limit,
            sender,
            cancel: cancel.clone(),
        });
        Ok(PresenceFeed::new(receiver, cancel))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// IDENTITY
// ═══════════════════════════════════════════════════════════════════════════

/// Password accounts in memory.
#[derive(Default)]
pub struct FakeIdentity {
    accounts: Mutex<HashMap<String, (String, String)>>,
    current: Mutex<Option<AuthSession>>,
    password_error: Mutex<Option<String>>,
    next_uid: AtomicUsize,
}

#[allow(dead_code)]
impl FakeIdentity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register an account without signing in; returns its uid.
    pub fn add_account(&self, email: &str, password: &str) -> String {
        let uid = format!("uid-{}", self.next_uid.fetch_add(1, Ordering::SeqCst) + 1);
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), (uid.clone(), password.to_string()));
        uid
    }

    pub fn password_of(&self, email: &str) -> Option<String> {
        self.accounts
            .lock()
            .unwrap()
            .get(email)
            .map(|(_, p)| p.clone())
    }

    pub fn fail_password_updates(&self, message: &str) {
        *self.password_error.lock().unwrap() = Some(message.to_string());
    }

    fn session(uid: &str, email: &str) -> AuthSession {
        AuthSession {
            uid: uid.to_string(),
            email: email.to_string(),
            id_token: format!("token-{}", uid),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn create_account(&self, email: &str, password: &str) -> Result<AuthSession> {
        if self.accounts.lock().unwrap().contains_key(email) {
            return Err(AppError::Auth(
                "The email address is already in use by another account".to_string(),
            ));
        }
        let uid = self.add_account(email, password);
        let session = Self::session(&uid, email);
        *self.current.lock().unwrap() = Some(session.clone());
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let uid = match self.accounts.lock().unwrap().get(email) {
            Some((uid, stored)) if stored == password => uid.clone(),
            _ => return Err(AppError::Auth("Incorrect email or password".to_string())),
        };
        let session = Self::session(&uid, email);
        *self.current.lock().unwrap() = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) {
        *self.current.lock().unwrap() = None;
    }

    async fn update_password(&self, new_password: &str) -> Result<()> {
        if let Some(message) = self.password_error.lock().unwrap().clone() {
            return Err(AppError::Auth(message));
        }
        let email = self
            .current
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.email.clone())
            .ok_or(AppError::Unauthorized)?;
        if let Some(account) = self.accounts.lock().unwrap().get_mut(&email) {
            account.1 = new_password.to_string();
        }
        Ok(())
    }

    fn current_user(&self) -> Option<AuthSession> {
        self.current.lock().unwrap().clone()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BLOB STORE
// ═══════════════════════════════════════════════════════════════════════════

/// Stored object: content type and bytes.
pub type StoredObject = (String, Vec<u8>);

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, StoredObject>>,
}

#[allow(dead_code)]
impl MemoryBlobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(path).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), (content_type.to_string(), bytes));
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String> {
        if !self.objects.lock().unwrap().contains_key(path) {
            return Err(AppError::Storage(format!("No object at {}", path)));
        }
        Ok(format!(
            "https://storage.test/{}?alt=media",
            urlencoding::encode(path)
        ))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// POSITION SOURCE
// ═══════════════════════════════════════════════════════════════════════════

/// Position source whose reads can be held open until released.
#[derive(Default)]
pub struct GatedPositions {
    position: Mutex<Option<Position>>,
    blocked: Mutex<bool>,
    release: Notify,
    reads: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight counter when a read finishes or is dropped.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[allow(dead_code)]
impl GatedPositions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, position: Option<Position>) {
        *self.position.lock().unwrap() = position;
    }

    /// Hold every read until [`GatedPositions::unblock`].
    pub fn block(&self) {
        *self.blocked.lock().unwrap() = true;
    }

    pub fn unblock(&self) {
        *self.blocked.lock().unwrap() = false;
        self.release.notify_waiters();
    }

    /// Reads started so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Reads started and neither finished nor abandoned.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PositionSource for GatedPositions {
    async fn last_known_position(&self) -> Result<Option<Position>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight(self.in_flight.clone());

        loop {
            let released = self.release.notified();
            let blocked = *self.blocked.lock().unwrap();
            if !blocked {
                break;
            }
            released.await;
        }
        Ok(*self.position.lock().unwrap())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BUILDERS
// ═══════════════════════════════════════════════════════════════════════════

/// Settings with short retry delays so failing writes settle quickly.
#[allow(dead_code)]
pub fn test_settings() -> SessionSettings {
    SessionSettings {
        retry: RetryPolicy {
            max_attempts: 3,
            initial_backoff: std::time::Duration::from_millis(10),
            max_backoff: std::time::Duration::from_millis(50),
        },
        ..SessionSettings::default()
    }
}

#[allow(dead_code)]
pub fn session_deps(store: &Arc<MemoryUserStore>, positions: &Arc<GatedPositions>) -> SessionDeps {
    SessionDeps {
        store: store.clone(),
        positions: positions.clone(),
    }
}

#[allow(dead_code)]
pub fn connected_user(uid: &str, latitude: f64, longitude: f64) -> User {
    User {
        uid: uid.to_string(),
        name: format!("User {}", uid),
        email: format!("{}@example.com", uid),
        latitude,
        longitude,
        is_connected: true,
        ..Default::default()
    }
}

/// App wired to in-memory fakes.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub identity: Arc<FakeIdentity>,
    pub store: Arc<MemoryUserStore>,
    pub blobs: Arc<MemoryBlobStore>,
}

/// Create a test app with in-memory dependencies.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let identity = FakeIdentity::new();
    let store = MemoryUserStore::new();
    let blobs = MemoryBlobStore::new();

    let state = Arc::new(AppState::new(
        Config::default(),
        identity.clone(),
        store.clone(),
        blobs.clone(),
        Arc::new(ReportedPosition::new()),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        identity,
        store,
        blobs,
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live location-sharing session.
//!
//! One actor task owns the [`SessionState`] and applies every event in
//! order:
//! 1. Toggle commands from the [`SessionHandle`]
//! 2. Fixes from the location poller
//! 3. Snapshots from the presence subscriber
//! 4. Failures reported by the presence publisher
//!
//! Poller and subscriber run per connect "generation" under a child
//! cancellation token; their results are tagged with the generation and
//! dropped once it is over.

pub mod path;
pub mod poller;
pub mod publisher;
pub mod state;
pub mod subscriber;

pub use path::PathTrail;
pub use publisher::RetryPolicy;
pub use state::{LocalFix, SessionState, SessionStatus, SessionView};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Position, PresenceUpdate, User};
use crate::platform::{PositionSource, UserStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Platform handles a session needs.
#[derive(Clone)]
pub struct SessionDeps {
    pub store: Arc<dyn UserStore>,
    pub positions: Arc<dyn PositionSource>,
}

/// Tunables for a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    pub poll_interval: Duration,
    /// Maximum remote users per snapshot
    pub fanout: u32,
    pub retry: RetryPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            fanout: 100,
            retry: RetryPolicy::default(),
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            fanout: config.presence_fanout,
            retry: RetryPolicy::from_config(config),
        }
    }
}

/// Everything the session actor reacts to.
pub(crate) enum SessionEvent {
    SetConnected {
        connected: bool,
        reply: oneshot::Sender<SessionView>,
    },
    LocalFix {
        generation: u64,
        result: Result<Option<Position>>,
    },
    Remote {
        generation: u64,
        users: Vec<User>,
    },
    SubscribeFailed {
        generation: u64,
        message: String,
    },
    PublishFailed(String),
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Tasks running for one connect generation.
struct Workers {
    cancel: CancellationToken,
    poller: JoinHandle<()>,
    subscriber: JoinHandle<()>,
}

impl Workers {
    async fn stop(self) {
        self.cancel.cancel();
        for (name, task) in [("poller", self.poller), ("subscriber", self.subscriber)] {
            if let Err(e) = task.await {
                tracing::warn!(task = name, error = %e, "Session worker ended abnormally");
            }
        }
    }
}

/// Entry point for starting sessions.
pub struct LocationSession;

impl LocationSession {
    /// Start a session for `uid`. The toggle starts off.
    pub fn start(uid: impl Into<String>, deps: SessionDeps, settings: SessionSettings) -> SessionHandle {
        let uid = uid.into();
        let state = SessionState::new(uid.clone(), settings.fanout as usize);
        let (view_tx, view_rx) = watch::channel(state.view());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let root = CancellationToken::new();

        let (publish_tx, publisher) = publisher::spawn_publisher(
            uid.clone(),
            deps.store.clone(),
            settings.retry,
            events_tx.clone(),
        );

        let actor = SessionActor {
            state,
            deps,
            settings,
            events_tx: events_tx.clone(),
            publish_tx: Some(publish_tx),
            publisher: Some(publisher),
            generation: 0,
            workers: None,
            view_tx,
            root: root.clone(),
        };
        let task = tokio::spawn(actor.run(events_rx));

        tracing::info!(uid = %uid, "Location session started");

        SessionHandle {
            uid,
            events: events_tx,
            view: view_rx,
            root,
            task: Some(task),
        }
    }
}

struct SessionActor {
    state: SessionState,
    deps: SessionDeps,
    settings: SessionSettings,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    publish_tx: Option<mpsc::UnboundedSender<PresenceUpdate>>,
    publisher: Option<JoinHandle<()>>,
    generation: u64,
    workers: Option<Workers>,
    view_tx: watch::Sender<SessionView>,
    root: CancellationToken,
}

impl SessionActor {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
        loop {
            let event = tokio::select! {
                biased;
                _ = self.root.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match event {
                SessionEvent::SetConnected { connected, reply } => {
                    if connected {
                        self.connect();
                    } else {
                        self.disconnect().await;
                    }
                    self.publish_view();
                    let _ = reply.send(self.state.view());
                }
                SessionEvent::LocalFix { generation, result } => {
                    if self.is_current(generation) {
                        self.on_local_fix(result);
                        self.publish_view();
                    }
                }
                SessionEvent::Remote { generation, users } => {
                    if self.is_current(generation) {
                        self.state.apply_remote(users);
                        self.publish_view();
                    }
                }
                SessionEvent::SubscribeFailed {
                    generation,
                    message,
                } => {
                    if self.is_current(generation) {
                        self.state.record_error(message);
                        self.publish_view();
                    }
                }
                SessionEvent::PublishFailed(message) => {
                    self.state.record_error(message);
                    self.publish_view();
                }
                SessionEvent::Shutdown { reply } => {
                    self.teardown().await;
                    let _ = reply.send(());
                    return;
                }
            }
        }

        self.teardown().await;
    }

    fn is_current(&self, generation: u64) -> bool {
        let current = self.state.is_connected() && generation == self.generation;
        if !current {
            tracing::debug!(generation, current = self.generation, "Dropping stale session event");
        }
        current
    }

    fn connect(&mut self) {
        if !self.state.connect() {
            return;
        }

        self.generation += 1;
        let generation = self.generation;
        let cancel = self.root.child_token();

        let poller = tokio::spawn(poller::run_poller(
            generation,
            self.deps.positions.clone(),
            self.settings.poll_interval,
            self.events_tx.clone(),
            cancel.clone(),
        ));
        let subscriber = tokio::spawn(subscriber::run_subscriber(
            generation,
            self.deps.store.clone(),
            self.settings.fanout,
            self.events_tx.clone(),
            cancel.clone(),
        ));

        self.workers = Some(Workers {
            cancel,
            poller,
            subscriber,
        });
        tracing::info!(uid = %self.state.uid(), generation, "Location sharing on");
    }

    async fn disconnect(&mut self) {
        if !self.state.is_connected() {
            return;
        }

        if let Some(workers) = self.workers.take() {
            workers.stop().await;
        }
        self.state.disconnect();
        self.enqueue(PresenceUpdate::disconnected());

        tracing::info!(uid = %self.state.uid(), generation = self.generation, "Location sharing off");
    }

    fn on_local_fix(&mut self, result: Result<Option<Position>>) {
        match result {
            Ok(Some(position)) => {
                if let LocalFix::Appended(position) = self.state.observe_local(position) {
                    self.enqueue(PresenceUpdate::connected_at(position));
                }
            }
            Ok(None) => self.state.observe_no_fix(),
            Err(AppError::PermissionDenied) => {
                tracing::warn!(uid = %self.state.uid(), "Location permission denied");
                self.state.observe_permission_denied();
            }
            Err(e) => {
                tracing::warn!(uid = %self.state.uid(), error = %e, "Failed to read position");
                self.state.record_error(e.user_message());
            }
        }
    }

    fn enqueue(&mut self, update: PresenceUpdate) {
        let sent = self
            .publish_tx
            .as_ref()
            .is_some_and(|tx| tx.send(update).is_ok());
        if !sent {
            tracing::error!(uid = %self.state.uid(), "Presence publisher is gone");
            self.state
                .record_error("Could not publish location status".to_string());
        }
    }

    fn publish_view(&self) {
        self.view_tx.send_replace(self.state.view());
    }

    /// Turn sharing off if needed, then flush pending presence writes.
    async fn teardown(&mut self) {
        self.disconnect().await;
        self.publish_view();

        // Closing the queue lets the publisher drain and exit.
        self.publish_tx = None;
        if let Some(publisher) = self.publisher.take() {
            if let Err(e) = publisher.await {
                tracing::warn!(error = %e, "Presence publisher ended abnormally");
            }
        }
        tracing::info!(uid = %self.state.uid(), "Location session ended");
    }
}

/// Handle owned by whoever shows the map. Dropping it ends the session.
pub struct SessionHandle {
    uid: String,
    events: mpsc::UnboundedSender<SessionEvent>,
    view: watch::Receiver<SessionView>,
    root: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Flip the toggle and return the view right after the transition.
    pub async fn set_connected(&self, connected: bool) -> Result<SessionView> {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(SessionEvent::SetConnected { connected, reply })
            .map_err(|_| session_stopped())?;
        rx.await.map_err(|_| session_stopped())
    }

    /// Latest published view.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Receiver notified on every view change.
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// End the session: sharing off, subscription released, writes flushed.
    pub async fn shutdown(mut self) {
        let (reply, rx) = oneshot::channel();
        if self.events.send(SessionEvent::Shutdown { reply }).is_ok() {
            let _ = rx.await;
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Session task ended abnormally");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

fn session_stopped() -> AppError {
    AppError::Internal(anyhow::anyhow!("Location session has stopped"))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Presence publisher: a single FIFO of writes to `users/{uid}`.
//!
//! Writes are applied one at a time in the order the session issued them, so
//! a disconnect can never be overtaken by an earlier connect.

use crate::config::Config;
use crate::error::Result;
use crate::models::PresenceUpdate;
use crate::platform::UserStore;
use crate::session::SessionEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Bounded exponential backoff for presence writes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.publish_max_attempts.max(1),
            initial_backoff: config.publish_backoff(),
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1` (`attempt` starts at 1).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Write one update, retrying per `policy`. Returns the last error.
pub async fn publish_with_retry(
    store: &dyn UserStore,
    uid: &str,
    update: &PresenceUpdate,
    policy: &RetryPolicy,
) -> Result<()> {
    let mut attempt = 1;
    loop {
        match store.update_presence(uid, update).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= policy.max_attempts => {
                tracing::error!(
                    uid,
                    attempt,
                    connected = update.is_connected,
                    error = %e,
                    "Presence write failed, giving up"
                );
                return Err(e);
            }
            Err(e) => {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    uid,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Presence write failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Start the publisher task. Closing the returned sender drains the queue
/// and ends the task.
pub(crate) fn spawn_publisher(
    uid: String,
    store: Arc<dyn UserStore>,
    policy: RetryPolicy,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> (mpsc::UnboundedSender<PresenceUpdate>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<PresenceUpdate>();

    let task = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            if let Err(e) = publish_with_retry(store.as_ref(), &uid, &update, &policy).await {
                // The session may already be gone during teardown.
                let _ = events.send(SessionEvent::PublishFailed(e.user_message()));
            }
        }
        tracing::debug!(uid = %uid, "Presence publisher stopped");
    });

    (tx, task)
}

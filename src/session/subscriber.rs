// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Presence subscriber: forwards connected-user snapshots to the session.

use crate::platform::UserStore;
use crate::session::SessionEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Hold a live query on connected users until `cancel` fires, then release it.
pub(crate) async fn run_subscriber(
    generation: u64,
    store: Arc<dyn UserStore>,
    limit: u32,
    events: mpsc::UnboundedSender<SessionEvent>,
    cancel: CancellationToken,
) {
    let opened = tokio::select! {
        _ = cancel.cancelled() => return,
        opened = store.watch_connected(limit) => opened,
    };

    let mut feed = match opened {
        Ok(feed) => feed,
        Err(e) => {
            tracing::error!(generation, error = %e, "Failed to subscribe to connected users");
            let _ = events.send(SessionEvent::SubscribeFailed {
                generation,
                message: e.user_message(),
            });
            return;
        }
    };

    loop {
        let users = tokio::select! {
            _ = cancel.cancelled() => break,
            next = feed.next() => match next {
                Some(users) => users,
                None => {
                    tracing::warn!(generation, "Connected-users feed ended");
                    break;
                }
            },
        };

        tracing::debug!(generation, count = users.len(), "Connected users pushed");
        if events
            .send(SessionEvent::Remote { generation, users })
            .is_err()
        {
            break;
        }
    }

    feed.close().await;
}

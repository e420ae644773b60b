// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location poller: reads the last known position on a fixed period.

use crate::platform::PositionSource;
use crate::session::SessionEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Poll until `cancel` fires. The first read happens immediately.
///
/// Cancellation is checked both while waiting for the next tick and while a
/// read is in flight, so a toggle-off never leaves the loop running.
pub(crate) async fn run_poller(
    generation: u64,
    source: Arc<dyn PositionSource>,
    period: Duration,
    events: mpsc::UnboundedSender<SessionEvent>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = source.last_known_position() => result,
        };

        if events
            .send(SessionEvent::LocalFix { generation, result })
            .is_err()
        {
            break;
        }
    }

    tracing::debug!(generation, "Location poller stopped");
}

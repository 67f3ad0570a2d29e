//! Connection Lifecycle Manager.
//!
//! ```text
//! NO_BROWSER ──attach──→ ATTACHED ──close / write failure──→ DETACHED
//!                          │                                   (session failed,
//!                          └──complete()──→ NO_BROWSER          pending requests
//!                                                               rejected)
//! ```
//!
//! Detach is observed through the channel stream's drop hook, so pending
//! requests fail in the same call that tears the connection down.

use crate::channel::push::{ChannelStream, PushChannel, PushError};
use crate::domain::error::{RelayError, RelayResult};
use crate::domain::pending::PendingRequestTable;
use crate::domain::protocol::{OutboundRequest, PushMessage, SessionStatus};
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Browser attachment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    NoBrowser,
    Attached,
    Detached,
}

/// Why a channel went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachReason {
    /// The HTTP stream was dropped (tab closed, navigation, crash).
    Closed,
    /// A push could not be written.
    WriteFailed,
}

/// Timing knobs for attachment.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleTimings {
    pub poll_interval: Duration,
    pub settle_delay: Duration,
}

impl Default for LifecycleTimings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// Tracks the single browser attachment and fails work when it goes away.
pub struct ConnectionLifecycle {
    channel: PushChannel,
    table: Arc<PendingRequestTable>,
    timings: LifecycleTimings,
}

impl ConnectionLifecycle {
    pub fn new(table: Arc<PendingRequestTable>, timings: LifecycleTimings) -> Arc<Self> {
        Arc::new(Self {
            channel: PushChannel::new(),
            table,
            timings,
        })
    }

    /// Attach a browser channel.
    ///
    /// Requests enqueued before the browser arrived are replayed in enqueue
    /// order right after the `connected` message.
    pub fn attach(self: &Arc<Self>) -> ChannelStream {
        let (generation, receiver) = self.channel.attach();
        let weak: Weak<Self> = Arc::downgrade(self);
        let stream = ChannelStream::new(generation, receiver, move |generation| {
            if let Some(lifecycle) = weak.upgrade() {
                lifecycle.detach(generation, DetachReason::Closed);
            }
        });

        if self.channel.generation() == Some(generation) {
            info!(generation = generation, "Browser attached");
            for request in self.table.queued() {
                debug!(request_id = %request.id, kind = %request.kind(), "Replaying queued request");
                if !self.deliver(request) {
                    break;
                }
            }
        }

        stream
    }

    /// Push one request to the browser.
    ///
    /// Returns false when nothing is attached or the write failed; a failed
    /// write is handled as a detach.
    pub fn deliver(&self, request: OutboundRequest) -> bool {
        let id = request.id;
        match self.channel.push(PushMessage::Request(request)) {
            Ok(generation) => {
                debug!(request_id = %id, generation = generation, "Pushed request");
                true
            }
            Err(PushError::Closed(generation)) => {
                warn!(request_id = %id, generation = generation, "Push failed, treating as detach");
                self.on_detached(generation, DetachReason::WriteFailed);
                false
            }
            Err(e) => {
                debug!(request_id = %id, reason = %e, "Request queued until a browser attaches");
                false
            }
        }
    }

    /// Handle the loss of channel `generation`.
    ///
    /// Stale generations are ignored. Losing the live channel rejects every
    /// pending request with [`RelayError::ConnectionLost`] and marks the
    /// session failed.
    pub fn detach(&self, generation: u64, reason: DetachReason) {
        if self.channel.release(generation) {
            self.on_detached(generation, reason);
        }
    }

    fn on_detached(&self, generation: u64, reason: DetachReason) {
        warn!(generation = generation, reason = ?reason, "Browser detached");
        // Completion first, so a request racing the drain either gets drained
        // or sees the terminal flag.
        if self.channel.complete(SessionStatus::Failed) {
            info!("Session marked failed after connection loss");
        }
        self.table.fail_all(RelayError::ConnectionLost);
    }

    /// Wait until a browser is attached and its settle delay has passed.
    ///
    /// Polls the attachment flag every `poll_interval`; gives up with
    /// [`RelayError::BrowserUnresponsive`] after `timeout`.
    pub async fn wait_for_attachment(&self, timeout: Duration) -> RelayResult<()> {
        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.timings.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if self.channel.completion().is_terminal() {
                return Err(RelayError::SessionClosed);
            }

            if let Some(attached_at) = self.channel.attached_at() {
                let settled_at = attached_at + self.timings.settle_delay;
                let now = Instant::now();
                if now >= settled_at {
                    return Ok(());
                }
                tokio::time::sleep(settled_at - now).await;
                if self.channel.is_attached() {
                    return Ok(());
                }
            }

            if started.elapsed() >= timeout {
                return Err(RelayError::BrowserUnresponsive {
                    waited: started.elapsed(),
                });
            }
        }
    }

    /// Mark the session complete and push the final notice.
    pub fn complete(&self, status: SessionStatus) -> bool {
        let completed = self.channel.complete(status);
        if completed {
            info!(status = ?status, "Session completed");
        }
        completed
    }

    pub fn state(&self) -> ConnectionState {
        if self.channel.is_attached() {
            ConnectionState::Attached
        } else if self.channel.completion() == SessionStatus::Failed {
            ConnectionState::Detached
        } else {
            ConnectionState::NoBrowser
        }
    }

    pub fn completion(&self) -> SessionStatus {
        self.channel.completion()
    }

    pub fn is_attached(&self) -> bool {
        self.channel.is_attached()
    }

    pub fn table(&self) -> &Arc<PendingRequestTable> {
        &self.table
    }
}

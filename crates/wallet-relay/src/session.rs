//! Relay session.
//!
//! All per-session mutable state lives here: the pending table, the channel
//! lifecycle, the address cache and the completion flag. Two sessions in one
//! process never share anything.

use crate::channel::{ChannelStream, ConnectionLifecycle, ConnectionState, LifecycleTimings};
use crate::domain::config::RelayConfig;
use crate::domain::error::{RelayError, RelayResult};
use crate::domain::operation::Operation;
use crate::domain::pending::{PendingRequestTable, PendingStats};
use crate::domain::protocol::{ResponseBody, SessionStatus};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Snapshot served by `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub pending: usize,
    pub session: SessionStatus,
    pub stats: StatsSnapshot,
}

/// Plain copy of [`PendingStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub registered: u64,
    pub resolved: u64,
    pub rejected: u64,
    pub timed_out: u64,
    pub late_responses: u64,
}

impl From<&PendingStats> for StatsSnapshot {
    fn from(stats: &PendingStats) -> Self {
        Self {
            registered: stats.registered.load(Ordering::Relaxed),
            resolved: stats.resolved.load(Ordering::Relaxed),
            rejected: stats.rejected.load(Ordering::Relaxed),
            timed_out: stats.timed_out.load(Ordering::Relaxed),
            late_responses: stats.late_responses.load(Ordering::Relaxed),
        }
    }
}

/// One CLI-to-browser session.
pub struct RelaySession {
    lifecycle: Arc<ConnectionLifecycle>,
    table: Arc<PendingRequestTable>,
    address: Mutex<Option<String>>,
    request_timeout: Duration,
    browser_timeout: Duration,
}

impl RelaySession {
    pub fn new(config: &RelayConfig) -> Arc<Self> {
        let table = PendingRequestTable::new(config.request_timeout);
        let lifecycle = ConnectionLifecycle::new(
            Arc::clone(&table),
            LifecycleTimings {
                poll_interval: config.attach_poll_interval,
                settle_delay: config.settle_delay,
            },
        );
        Arc::new(Self {
            lifecycle,
            table,
            address: Mutex::new(None),
            request_timeout: config.request_timeout,
            browser_timeout: config.browser_timeout,
        })
    }

    /// Run one operation through the browser.
    ///
    /// Operations that don't require a browser are answered from the address
    /// cache when it is filled, even after the session has ended. Everything
    /// else waits for attachment, enqueues with the session's request
    /// timeout, pushes and awaits the raw JSON result.
    pub async fn request(&self, operation: Operation) -> RelayResult<serde_json::Value> {
        let kind = operation.kind();
        if !kind.requires_browser() {
            if let Some(address) = self.cached_address() {
                debug!(kind = %kind, "Answered from session cache");
                return Ok(serde_json::Value::String(address));
            }
        }

        if self.lifecycle.completion().is_terminal() {
            return Err(RelayError::SessionClosed);
        }
        self.lifecycle
            .wait_for_attachment(self.browser_timeout)
            .await?;

        self.enqueue_and_await(operation).await
    }

    async fn enqueue_and_await(&self, operation: Operation) -> RelayResult<serde_json::Value> {
        let (request, response) = self.table.enqueue(operation, Some(self.request_timeout));
        let id = request.id;
        let delivered = self.lifecycle.deliver(request);

        // The session can end between attachment and enqueue. Completion is
        // set before the table is drained, so an entry that missed the drain
        // sees the terminal flag here.
        if !delivered && self.lifecycle.completion().is_terminal() && self.table.is_pending(&id) {
            debug!(request_id = %id, "Session ended before delivery");
            self.table.reject(id, RelayError::SessionClosed);
        }
        response.await
    }

    /// Open a push channel for a browser.
    pub fn attach(&self) -> ChannelStream {
        self.lifecycle.attach()
    }

    /// Apply a browser response.
    ///
    /// Returns whether the id was still pending. Unknown ids are ignored.
    pub fn submit(&self, body: ResponseBody) -> bool {
        match body.error {
            Some(error) => self
                .table
                .reject_with(body.id, |kind| error.into_relay_error(kind)),
            None => self
                .table
                .resolve(body.id, body.result.unwrap_or(serde_json::Value::Null)),
        }
    }

    pub fn cached_address(&self) -> Option<String> {
        self.address.lock().clone()
    }

    pub fn cache_address(&self, address: &str) {
        let mut cached = self.address.lock();
        if cached.is_none() {
            debug!(address = address, "Cached active address");
            *cached = Some(address.to_string());
        }
    }

    /// Set the completion flag and send the final notice.
    ///
    /// Returns false if the session had already completed.
    pub fn complete(&self, status: SessionStatus) -> bool {
        self.lifecycle.complete(status)
    }

    /// Complete the session and reject anything still pending with
    /// [`RelayError::SessionClosed`].
    pub fn close(&self, status: SessionStatus) {
        self.complete(status);
        let rejected = self.table.fail_all(RelayError::SessionClosed);
        info!(status = ?status, rejected = rejected, "Session closed");
    }

    pub fn status(&self) -> SessionStatus {
        self.lifecycle.completion()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.lifecycle.state(),
            pending: self.table.pending_count(),
            session: self.lifecycle.completion(),
            stats: StatsSnapshot::from(self.table.stats()),
        }
    }

    pub fn table(&self) -> &Arc<PendingRequestTable> {
        &self.table
    }

    pub fn lifecycle(&self) -> &Arc<ConnectionLifecycle> {
        &self.lifecycle
    }
}

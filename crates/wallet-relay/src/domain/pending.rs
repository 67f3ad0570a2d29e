//! Pending Request Table.
//!
//! Maps request ids to callers waiting on a browser-side result.
//!
//! Flow:
//! 1. The façade calls `enqueue()` and gets the outbound request plus a
//!    [`PendingResponse`] future
//! 2. The request is pushed to the browser
//! 3. The response endpoint calls `resolve()` / `reject()`
//! 4. Otherwise the armed timer or `fail_all()` settles it
//!
//! An id leaves the map the instant it is settled, so late or duplicate
//! answers find nothing and are dropped.

use crate::domain::correlation::RequestId;
use crate::domain::error::{RelayError, RelayResult};
use crate::domain::operation::{Operation, OperationKind};
use crate::domain::protocol::OutboundRequest;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

/// A request waiting for a browser-side result
struct PendingRequest {
    /// Serialized request, kept for replay on attach
    request: OutboundRequest,
    /// Enqueue order
    sequence: u64,
    /// Channel to settle the caller
    sender: oneshot::Sender<RelayResult<serde_json::Value>>,
    /// When request was created
    created_at: Instant,
    /// Armed timeout, aborted on settle
    timer: Option<AbortHandle>,
}

impl PendingRequest {
    fn settle(self, result: RelayResult<serde_json::Value>) -> bool {
        if let Some(timer) = &self.timer {
            timer.abort();
        }
        self.sender.send(result).is_ok()
    }
}

/// Statistics for the pending request table
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total requests enqueued
    pub registered: AtomicU64,
    /// Total requests resolved with a value
    pub resolved: AtomicU64,
    /// Total requests rejected (browser error, detach, close)
    pub rejected: AtomicU64,
    /// Total requests timed out
    pub timed_out: AtomicU64,
    /// Responses for ids that were no longer pending
    pub late_responses: AtomicU64,
}

/// Future returned by [`PendingRequestTable::enqueue`].
///
/// Resolves with the raw JSON result or the rejection that settled it.
#[derive(Debug)]
pub struct PendingResponse {
    id: RequestId,
    receiver: oneshot::Receiver<RelayResult<serde_json::Value>>,
}

impl PendingResponse {
    pub fn id(&self) -> RequestId {
        self.id
    }
}

impl Future for PendingResponse {
    type Output = RelayResult<serde_json::Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            // sender dropped without settling: the table itself went away
            .map(|settled| settled.unwrap_or(Err(RelayError::SessionClosed)))
    }
}

/// Pending request table.
pub struct PendingRequestTable {
    /// Map of request ID to pending request
    pending: DashMap<RequestId, PendingRequest>,
    /// Next enqueue sequence number
    next_sequence: AtomicU64,
    /// Default timeout
    default_timeout: Duration,
    /// Statistics
    stats: PendingStats,
}

impl PendingRequestTable {
    /// Create a new table
    pub fn new(default_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            pending: DashMap::new(),
            next_sequence: AtomicU64::new(0),
            default_timeout,
            stats: PendingStats::default(),
        })
    }

    /// Register a request and arm its timeout.
    ///
    /// Must be called inside a tokio runtime; the timeout is a spawned task
    /// that removes the entry and rejects the caller with
    /// [`RelayError::Timeout`].
    pub fn enqueue(
        self: &Arc<Self>,
        operation: Operation,
        timeout: Option<Duration>,
    ) -> (OutboundRequest, PendingResponse) {
        let id = RequestId::new();
        let kind = operation.kind();
        let timeout = timeout.unwrap_or(self.default_timeout);
        let (tx, rx) = oneshot::channel();
        let request = OutboundRequest { id, operation };

        self.pending.insert(
            id,
            PendingRequest {
                request: request.clone(),
                sequence: self.next_sequence.fetch_add(1, Ordering::SeqCst),
                sender: tx,
                created_at: Instant::now(),
                timer: None,
            },
        );
        self.stats.registered.fetch_add(1, Ordering::Relaxed);

        // Armed after insert so a zero timeout can't fire before the entry exists
        let timer = tokio::spawn(expire_after(Arc::downgrade(self), id, timeout)).abort_handle();
        match self.pending.get_mut(&id) {
            Some(mut entry) => entry.timer = Some(timer),
            None => timer.abort(),
        }

        debug!(
            request_id = %id,
            kind = %kind,
            timeout_ms = timeout.as_millis(),
            "Enqueued pending request"
        );

        (request, PendingResponse { id, receiver: rx })
    }

    /// Settle a request with a value.
    ///
    /// Returns false when the id is unknown (already settled or timed out).
    pub fn resolve(&self, id: RequestId, result: serde_json::Value) -> bool {
        match self.pending.remove(&id) {
            Some((_, pending)) => {
                let kind = pending.request.kind();
                let elapsed = pending.created_at.elapsed();
                pending.settle(Ok(result));
                self.stats.resolved.fetch_add(1, Ordering::Relaxed);
                debug!(
                    request_id = %id,
                    kind = %kind,
                    elapsed_ms = elapsed.as_millis(),
                    "Resolved pending request"
                );
                true
            }
            None => self.note_late(id),
        }
    }

    /// Settle a request with an error.
    ///
    /// The error is built from the request's kind, so browser errors can be
    /// attributed without the caller knowing what was asked.
    pub fn reject_with<F>(&self, id: RequestId, error: F) -> bool
    where
        F: FnOnce(OperationKind) -> RelayError,
    {
        match self.pending.remove(&id) {
            Some((_, pending)) => {
                let kind = pending.request.kind();
                let error = error(kind);
                debug!(request_id = %id, kind = %kind, error = %error, "Rejected pending request");
                pending.settle(Err(error));
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => self.note_late(id),
        }
    }

    /// Settle a request with a fixed error.
    pub fn reject(&self, id: RequestId, error: RelayError) -> bool {
        self.reject_with(id, |_| error)
    }

    /// Reject every pending request with `error` and empty the table.
    ///
    /// Returns the number of requests failed.
    pub fn fail_all(&self, error: RelayError) -> usize {
        let ids: Vec<RequestId> = self.pending.iter().map(|entry| *entry.key()).collect();
        let mut failed = 0;
        for id in ids {
            if let Some((_, pending)) = self.pending.remove(&id) {
                pending.settle(Err(error.clone()));
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                failed += 1;
            }
        }
        if failed > 0 {
            warn!(failed = failed, error = %error, "Failed all pending requests");
        }
        failed
    }

    /// Pending requests in enqueue order.
    pub fn queued(&self) -> Vec<OutboundRequest> {
        let mut queued: Vec<(u64, OutboundRequest)> = self
            .pending
            .iter()
            .map(|entry| (entry.sequence, entry.request.clone()))
            .collect();
        queued.sort_by_key(|(sequence, _)| *sequence);
        queued.into_iter().map(|(_, request)| request).collect()
    }

    /// Get number of currently pending requests
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if an id is pending
    pub fn is_pending(&self, id: &RequestId) -> bool {
        self.pending.contains_key(id)
    }

    /// Get statistics
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }

    fn expire(&self, id: RequestId) {
        if let Some((_, pending)) = self.pending.remove(&id) {
            let kind = pending.request.kind();
            let elapsed = pending.created_at.elapsed();
            warn!(
                request_id = %id,
                kind = %kind,
                elapsed_ms = elapsed.as_millis(),
                "Pending request timed out"
            );
            self.stats.timed_out.fetch_add(1, Ordering::Relaxed);
            pending.settle(Err(RelayError::Timeout { kind, elapsed }));
        }
    }

    fn note_late(&self, id: RequestId) -> bool {
        self.stats.late_responses.fetch_add(1, Ordering::Relaxed);
        warn!(request_id = %id, "Response for unknown or expired request id");
        false
    }
}

async fn expire_after(table: Weak<PendingRequestTable>, id: RequestId, timeout: Duration) {
    tokio::time::sleep(timeout).await;
    if let Some(table) = table.upgrade() {
        table.expire(id);
    }
}

//! Push channel (server → browser).
//!
//! Holds at most one attached channel. Each attach gets a new generation;
//! a stale handle from an older generation can neither push nor detach the
//! current one.

use crate::domain::protocol::{PushMessage, SessionStatus};
use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::mpsc;

/// Reasons a push could not be written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    #[error("no browser attached")]
    NotAttached,
    #[error("channel generation {0} closed")]
    Closed(u64),
    #[error("session already completed")]
    Completed,
}

struct ActiveChannel {
    generation: u64,
    sender: mpsc::UnboundedSender<PushMessage>,
    attached_at: Instant,
}

#[derive(Default)]
struct ChannelState {
    active: Option<ActiveChannel>,
    next_generation: u64,
    completed: Option<SessionStatus>,
}

/// Single-attachment push channel.
#[derive(Default)]
pub struct PushChannel {
    state: Mutex<ChannelState>,
}

impl PushChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new channel, replacing any previous one.
    ///
    /// The `connected` message is queued first. A displaced channel gets a
    /// final `replaced` message so its page stops reconnecting. If the
    /// session has already completed, the returned receiver carries only the
    /// completion message and the generation is not attached.
    pub fn attach(&self) -> (u64, mpsc::UnboundedReceiver<PushMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        state.next_generation += 1;
        let generation = state.next_generation;

        if let Some(status) = state.completed {
            let _ = tx.send(PushMessage::Completed { status });
            return (generation, rx);
        }

        if let Some(previous) = state.active.take() {
            let _ = previous.sender.send(PushMessage::Replaced);
        }
        let _ = tx.send(PushMessage::Connected { generation });
        state.active = Some(ActiveChannel {
            generation,
            sender: tx,
            attached_at: Instant::now(),
        });
        (generation, rx)
    }

    /// Write one message to the attached channel without blocking.
    ///
    /// On a failed write the channel is released; the returned
    /// [`PushError::Closed`] carries the generation that went away.
    pub fn push(&self, message: PushMessage) -> Result<u64, PushError> {
        let mut state = self.state.lock();
        if state.completed.is_some() {
            return Err(PushError::Completed);
        }
        let active = state.active.as_ref().ok_or(PushError::NotAttached)?;
        let generation = active.generation;
        if active.sender.send(message).is_err() {
            state.active = None;
            return Err(PushError::Closed(generation));
        }
        Ok(generation)
    }

    /// Release `generation` if it is still the attached one.
    ///
    /// Returns true when this call performed the detach.
    pub fn release(&self, generation: u64) -> bool {
        let mut state = self.state.lock();
        match &state.active {
            Some(active) if active.generation == generation => {
                state.active = None;
                true
            }
            _ => false,
        }
    }

    /// Send the final completion message and close the channel.
    ///
    /// Returns false if the session was already completed.
    pub fn complete(&self, status: SessionStatus) -> bool {
        let mut state = self.state.lock();
        if state.completed.is_some() {
            return false;
        }
        state.completed = Some(status);
        if let Some(active) = state.active.take() {
            let _ = active.sender.send(PushMessage::Completed { status });
        }
        true
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().active.is_some()
    }

    /// Current generation, if attached.
    pub fn generation(&self) -> Option<u64> {
        self.state.lock().active.as_ref().map(|a| a.generation)
    }

    /// When the current channel attached.
    pub fn attached_at(&self) -> Option<Instant> {
        self.state.lock().active.as_ref().map(|a| a.attached_at)
    }

    pub fn completion(&self) -> SessionStatus {
        self.state.lock().completed.unwrap_or(SessionStatus::Pending)
    }
}

/// Receiving half of an attached channel.
///
/// Dropping it (the HTTP body going away) runs `on_close` with the
/// generation, in the same call stack as the drop.
pub struct ChannelStream {
    generation: u64,
    receiver: mpsc::UnboundedReceiver<PushMessage>,
    on_close: Option<Box<dyn FnOnce(u64) + Send>>,
}

impl ChannelStream {
    pub fn new(
        generation: u64,
        receiver: mpsc::UnboundedReceiver<PushMessage>,
        on_close: impl FnOnce(u64) + Send + 'static,
    ) -> Self {
        Self {
            generation,
            receiver,
            on_close: Some(Box::new(on_close)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Receive the next message; `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<PushMessage> {
        self.receiver.recv().await
    }

    /// Take an already-queued message without waiting.
    pub fn try_recv(&mut self) -> Option<PushMessage> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for ChannelStream {
    type Item = PushMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for ChannelStream {
    fn drop(&mut self) {
        if let Some(on_close) = self.on_close.take() {
            on_close(self.generation);
        }
    }
}

//! Server→browser push channel and its attachment lifecycle.

pub mod lifecycle;
pub mod push;

pub use lifecycle::{ConnectionLifecycle, ConnectionState, DetachReason, LifecycleTimings};
pub use push::{ChannelStream, PushChannel, PushError};

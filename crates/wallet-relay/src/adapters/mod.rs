//! Adapters for the relay.
//!
//! Process-level implementations of the outbound ports.

pub mod browser;
pub mod port_release;

pub use browser::{ManualBrowser, SystemBrowser};
pub use port_release::KillPortReleaser;

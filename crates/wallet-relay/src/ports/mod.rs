//! Ports (trait seams) of the relay.

pub mod outbound;

pub use outbound::{BrowserLauncher, PortReleaser};

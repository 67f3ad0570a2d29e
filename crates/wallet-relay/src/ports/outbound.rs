//! Outbound ports for the relay.

use crate::domain::error::RelayResult;
use async_trait::async_trait;

/// Opens the signer page in a browser.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Open `url`. Returns once the browser process has been started, not
    /// once the page has loaded.
    async fn launch(&self, url: &str) -> RelayResult<()>;
}

/// Frees a local TCP port held by another process.
#[async_trait]
pub trait PortReleaser: Send + Sync {
    /// Returns the number of processes signalled.
    async fn release(&self, port: u16) -> RelayResult<usize>;
}

//! Wallet Relay - local HTTP bridge between a CLI process and a browser
//! wallet extension.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          WALLET RELAY                                │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  BrowserWallet (one method per wallet capability)                    │
//! │         │ encode binary → enqueue → await → decode                   │
//! │  ┌──────┴───────────────────────────────┐                            │
//! │  │          Pending Request Table       │  id → oneshot + timer      │
//! │  └──────┬───────────────────────▲───────┘                            │
//! │         │ push                  │ resolve / reject                   │
//! │  ┌──────┴───────┐        ┌──────┴───────┐                            │
//! │  │ GET /events  │        │POST /response│   loopback only            │
//! │  └──────┬───────┘        └──────▲───────┘                            │
//! └─────────┼───────────────────────┼────────────────────────────────────┘
//!           ▼                       │
//!      signer page  ──── window.arweaveWallet ────
//! ```
//!
//! The push channel's close is observed synchronously: closing the tab
//! rejects every pending operation with `ConnectionLost` and marks the
//! session failed.
//!
//! # Usage
//!
//! ```ignore
//! use wallet_relay::{BrowserWallet, RelayConfig, SessionStatus};
//!
//! let wallet = BrowserWallet::initialize(RelayConfig::from_env()?).await?;
//! let address = wallet.get_active_address().await?;
//! wallet.close(SessionStatus::Success).await;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod channel;
pub mod domain;
pub mod middleware;
pub mod ports;
pub mod router;
pub mod service;
pub mod session;
pub mod wallet;

// Re-exports for public API
pub use adapters::{ManualBrowser, SystemBrowser};
pub use channel::ConnectionState;
pub use domain::config::{BrowserConfig, ConfigError, CorsConfig, RelayConfig};
pub use domain::data_item::{data_item_id, SignedDataItem};
pub use domain::error::{RelayError, RelayResult};
pub use domain::operation::{
    AppInfo, Gateway, HashOptions, Operation, OperationKind, Permission, TokenType,
};
pub use domain::protocol::SessionStatus;
pub use domain::transaction::{Tag, Transaction};
pub use ports::BrowserLauncher;
pub use service::RelayService;
pub use session::RelaySession;
pub use wallet::{BrowserWallet, DataItem, DataItemSigner, DispatchResult, SignerInfo, TokenInfo};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

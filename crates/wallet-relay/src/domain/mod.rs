//! Domain types for the wallet relay.
//!
//! This module contains the core types, configuration, and error handling,
//! plus the pending request table every operation flows through.

pub mod config;
pub mod correlation;
pub mod data_item;
pub mod encoding;
pub mod error;
pub mod operation;
pub mod pending;
pub mod protocol;
pub mod transaction;

// Re-exports for convenience
pub use config::{BrowserConfig, ConfigError, CorsConfig, RelayConfig};
pub use correlation::RequestId;
pub use data_item::{data_item_id, SignedDataItem};
pub use error::{RelayError, RelayResult};
pub use operation::{Operation, OperationKind, Permission};
pub use pending::{PendingRequestTable, PendingResponse, PendingStats};
pub use protocol::{BrowserError, OutboundRequest, PushMessage, ResponseBody, SessionStatus};
pub use transaction::{Tag, Transaction};

//! Relay error taxonomy.
//!
//! Every failure an operation can see is a [`RelayError`]. Errors are `Clone`
//! because a single detach fans the same value out to every pending caller.

use crate::domain::operation::OperationKind;
use std::time::Duration;

/// Error codes the signer page attaches to browser-side failures.
pub mod codes {
    /// The extension does not expose the requested method.
    pub const UNSUPPORTED_CAPABILITY: &str = "UNSUPPORTED_CAPABILITY";
    /// No wallet extension was injected into the page.
    pub const NO_WALLET: &str = "NO_WALLET";
}

/// Relay error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// Listen port already taken.
    #[error(
        "port {port} is already in use; use port 0 for an ephemeral port, \
         free the port manually, or enable free_port to reclaim it automatically"
    )]
    PortInUse { port: u16 },

    /// Any other bind failure.
    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    /// No browser attached within the attachment window.
    #[error("browser page not responding after {}ms", waited.as_millis())]
    BrowserUnresponsive { waited: Duration },

    /// The browser is attached but did not answer this request in time.
    #[error("timed out waiting for `{kind}` after {}ms", elapsed.as_millis())]
    Timeout {
        kind: OperationKind,
        elapsed: Duration,
    },

    /// The push channel went away while requests were pending.
    #[error("connection lost: browser page disconnected")]
    ConnectionLost,

    /// The extension reported an error; the message is passed through verbatim.
    #[error("{message}")]
    Extension {
        kind: OperationKind,
        message: String,
    },

    /// The extension does not support the requested capability.
    #[error("wallet extension does not support `{kind}`")]
    CapabilityMissing { kind: OperationKind },

    /// The session has been closed or has failed.
    #[error("session closed")]
    SessionClosed,

    /// The browser answered with a value of the wrong shape.
    #[error("malformed `{kind}` result: {reason}")]
    MalformedResult {
        kind: OperationKind,
        reason: String,
    },

    /// Transport decoding failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Signed data item bytes could not be parsed.
    #[error("invalid data item: {0}")]
    InvalidDataItem(String),

    /// Browser process could not be started.
    #[error("failed to launch browser: {0}")]
    BrowserLaunch(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RelayError {
    /// Whether the error ends the whole session rather than one request.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            RelayError::ConnectionLost
                | RelayError::SessionClosed
                | RelayError::BrowserUnresponsive { .. }
        )
    }
}

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

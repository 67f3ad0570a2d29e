//! Messages exchanged with the signer page.

use crate::domain::correlation::RequestId;
use crate::domain::error::{codes, RelayError};
use crate::domain::operation::{Operation, OperationKind};
use serde::{Deserialize, Serialize};

/// Completion flag of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Success,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Pending)
    }
}

/// A request as delivered to the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub id: RequestId,
    #[serde(flatten)]
    pub operation: Operation,
}

impl OutboundRequest {
    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }
}

/// One discrete message on the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PushMessage {
    /// First message on every channel.
    Connected { generation: u64 },
    /// A wallet operation to run.
    Request(OutboundRequest),
    /// Last message on a channel another tab has taken over.
    Replaced,
    /// Last message ever sent on a channel.
    Completed { status: SessionStatus },
}

/// Error reported by the signer page, either a bare string or `{message, code}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BrowserError {
    Message(String),
    Detailed {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl BrowserError {
    pub fn message(&self) -> &str {
        match self {
            BrowserError::Message(message) => message,
            BrowserError::Detailed { message, .. } => message,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            BrowserError::Message(_) => None,
            BrowserError::Detailed { code, .. } => code.as_deref(),
        }
    }

    /// Map to the relay error a caller of `kind` will see.
    pub fn into_relay_error(self, kind: OperationKind) -> RelayError {
        if self.code() == Some(codes::UNSUPPORTED_CAPABILITY) {
            return RelayError::CapabilityMissing { kind };
        }
        RelayError::Extension {
            kind,
            message: self.message().to_string(),
        }
    }
}

/// Body of `POST /response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    pub id: RequestId,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<BrowserError>,
}

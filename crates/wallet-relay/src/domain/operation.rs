//! Wallet operation registry.
//!
//! Every capability the relay can ask the extension for is a variant of
//! [`Operation`]. The kind tag on the wire is the camelCase method name the
//! extension exposes (`signDataItem`, `getActiveAddress`, ...).

use crate::domain::transaction::{Tag, Transaction};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind tag of a wallet operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    Connect,
    GetActiveAddress,
    GetAllAddresses,
    GetWalletNames,
    GetPermissions,
    GetArweaveConfig,
    GetActivePublicKey,
    Signature,
    Sign,
    Dispatch,
    Encrypt,
    Decrypt,
    PrivateHash,
    AddToken,
    IsTokenAdded,
    SignDataItem,
    BatchSignDataItem,
    SignMessage,
    VerifyMessage,
    TokenBalance,
    UserTokens,
    GetWanderTierInfo,
    Disconnect,
}

impl OperationKind {
    /// All kinds, in registry order.
    pub const ALL: [OperationKind; 23] = [
        OperationKind::Connect,
        OperationKind::GetActiveAddress,
        OperationKind::GetAllAddresses,
        OperationKind::GetWalletNames,
        OperationKind::GetPermissions,
        OperationKind::GetArweaveConfig,
        OperationKind::GetActivePublicKey,
        OperationKind::Signature,
        OperationKind::Sign,
        OperationKind::Dispatch,
        OperationKind::Encrypt,
        OperationKind::Decrypt,
        OperationKind::PrivateHash,
        OperationKind::AddToken,
        OperationKind::IsTokenAdded,
        OperationKind::SignDataItem,
        OperationKind::BatchSignDataItem,
        OperationKind::SignMessage,
        OperationKind::VerifyMessage,
        OperationKind::TokenBalance,
        OperationKind::UserTokens,
        OperationKind::GetWanderTierInfo,
        OperationKind::Disconnect,
    ];

    /// Wire tag, identical to the extension's method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Connect => "connect",
            OperationKind::GetActiveAddress => "getActiveAddress",
            OperationKind::GetAllAddresses => "getAllAddresses",
            OperationKind::GetWalletNames => "getWalletNames",
            OperationKind::GetPermissions => "getPermissions",
            OperationKind::GetArweaveConfig => "getArweaveConfig",
            OperationKind::GetActivePublicKey => "getActivePublicKey",
            OperationKind::Signature => "signature",
            OperationKind::Sign => "sign",
            OperationKind::Dispatch => "dispatch",
            OperationKind::Encrypt => "encrypt",
            OperationKind::Decrypt => "decrypt",
            OperationKind::PrivateHash => "privateHash",
            OperationKind::AddToken => "addToken",
            OperationKind::IsTokenAdded => "isTokenAdded",
            OperationKind::SignDataItem => "signDataItem",
            OperationKind::BatchSignDataItem => "batchSignDataItem",
            OperationKind::SignMessage => "signMessage",
            OperationKind::VerifyMessage => "verifyMessage",
            OperationKind::TokenBalance => "tokenBalance",
            OperationKind::UserTokens => "userTokens",
            OperationKind::GetWanderTierInfo => "getWanderTierInfo",
            OperationKind::Disconnect => "disconnect",
        }
    }

    /// Whether the operation needs a live browser session.
    ///
    /// Only `getActiveAddress` can be answered locally, and only once the
    /// address has been cached.
    pub fn requires_browser(&self) -> bool {
        !matches!(self, OperationKind::GetActiveAddress)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown kind tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for OperationKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Permission scopes the extension can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    AccessAddress,
    AccessPublicKey,
    AccessAllAddresses,
    SignTransaction,
    Encrypt,
    Decrypt,
    Signature,
    AccessArweaveConfig,
    Dispatch,
    AccessTokens,
}

impl Permission {
    /// Every permission, for callers that want a full grant.
    pub const ALL: [Permission; 10] = [
        Permission::AccessAddress,
        Permission::AccessPublicKey,
        Permission::AccessAllAddresses,
        Permission::SignTransaction,
        Permission::Encrypt,
        Permission::Decrypt,
        Permission::Signature,
        Permission::AccessArweaveConfig,
        Permission::Dispatch,
        Permission::AccessTokens,
    ];
}

/// Application metadata shown in the extension's permission prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// Arweave gateway coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gateway {
    pub host: String,
    pub port: u16,
    pub protocol: String,
}

impl Default for Gateway {
    fn default() -> Self {
        Self {
            host: "arweave.net".to_string(),
            port: 443,
            protocol: "https".to_string(),
        }
    }
}

/// Hash options for `privateHash` / `signMessage` / `verifyMessage`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_algorithm: Option<String>,
}

/// Token type accepted by `addToken`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Asset,
    Collectible,
}

/// An unsigned data item as handed to the extension.
///
/// `data` is carried in transport encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedDataItem {
    pub data: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
}

/// A wallet operation together with its parameters.
///
/// Serialized adjacently tagged so a push message reads
/// `{"type":"request","id":..,"kind":"sign","params":{..}}`. Binary
/// parameters are already base64 text at this point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "camelCase")]
pub enum Operation {
    #[serde(rename_all = "camelCase")]
    Connect {
        permissions: Vec<Permission>,
        #[serde(skip_serializing_if = "Option::is_none")]
        app_info: Option<AppInfo>,
        #[serde(skip_serializing_if = "Option::is_none")]
        gateway: Option<Gateway>,
    },
    GetActiveAddress,
    GetAllAddresses,
    GetWalletNames,
    GetPermissions,
    GetArweaveConfig,
    GetActivePublicKey,
    Signature {
        data: String,
        algorithm: serde_json::Value,
    },
    Sign {
        transaction: Transaction,
        #[serde(skip_serializing_if = "Option::is_none")]
        options: Option<serde_json::Value>,
    },
    Dispatch {
        transaction: Transaction,
        #[serde(skip_serializing_if = "Option::is_none")]
        options: Option<serde_json::Value>,
    },
    Encrypt {
        data: String,
        algorithm: serde_json::Value,
    },
    Decrypt {
        data: String,
        algorithm: serde_json::Value,
    },
    PrivateHash {
        data: String,
        options: HashOptions,
    },
    AddToken {
        id: String,
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        token_type: Option<TokenType>,
        #[serde(skip_serializing_if = "Option::is_none")]
        gateway: Option<Gateway>,
    },
    IsTokenAdded {
        id: String,
    },
    SignDataItem {
        item: EncodedDataItem,
    },
    BatchSignDataItem {
        items: Vec<EncodedDataItem>,
    },
    SignMessage {
        data: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        options: Option<HashOptions>,
    },
    #[serde(rename_all = "camelCase")]
    VerifyMessage {
        data: String,
        signature: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        public_key: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        options: Option<HashOptions>,
    },
    TokenBalance {
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    UserTokens {
        fetch_balance: bool,
    },
    GetWanderTierInfo,
    Disconnect,
}

impl Operation {
    /// Kind tag of this operation.
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Connect { .. } => OperationKind::Connect,
            Operation::GetActiveAddress => OperationKind::GetActiveAddress,
            Operation::GetAllAddresses => OperationKind::GetAllAddresses,
            Operation::GetWalletNames => OperationKind::GetWalletNames,
            Operation::GetPermissions => OperationKind::GetPermissions,
            Operation::GetArweaveConfig => OperationKind::GetArweaveConfig,
            Operation::GetActivePublicKey => OperationKind::GetActivePublicKey,
            Operation::Signature { .. } => OperationKind::Signature,
            Operation::Sign { .. } => OperationKind::Sign,
            Operation::Dispatch { .. } => OperationKind::Dispatch,
            Operation::Encrypt { .. } => OperationKind::Encrypt,
            Operation::Decrypt { .. } => OperationKind::Decrypt,
            Operation::PrivateHash { .. } => OperationKind::PrivateHash,
            Operation::AddToken { .. } => OperationKind::AddToken,
            Operation::IsTokenAdded { .. } => OperationKind::IsTokenAdded,
            Operation::SignDataItem { .. } => OperationKind::SignDataItem,
            Operation::BatchSignDataItem { .. } => OperationKind::BatchSignDataItem,
            Operation::SignMessage { .. } => OperationKind::SignMessage,
            Operation::VerifyMessage { .. } => OperationKind::VerifyMessage,
            Operation::TokenBalance { .. } => OperationKind::TokenBalance,
            Operation::UserTokens { .. } => OperationKind::UserTokens,
            Operation::GetWanderTierInfo => OperationKind::GetWanderTierInfo,
            Operation::Disconnect => OperationKind::Disconnect,
        }
    }
}

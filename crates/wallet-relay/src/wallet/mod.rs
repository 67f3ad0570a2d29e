//! Operation façade.
//!
//! [`BrowserWallet`] exposes one typed method per wallet capability. Each
//! method encodes binary input, runs the operation through the session and
//! decodes the browser's answer. Failures from the pending table reach the
//! caller unchanged.

pub mod signer;

pub use signer::{DataItemSigner, SignerInfo};

use crate::adapters::{ManualBrowser, SystemBrowser};
use crate::domain::config::RelayConfig;
use crate::domain::data_item::SignedDataItem;
use crate::domain::encoding;
use crate::domain::error::{RelayError, RelayResult};
use crate::domain::operation::{
    AppInfo, EncodedDataItem, Gateway, HashOptions, Operation, OperationKind, Permission,
    TokenType,
};
use crate::domain::protocol::SessionStatus;
use crate::domain::transaction::{Tag, Transaction};
use crate::ports::BrowserLauncher;
use crate::service::RelayService;
use crate::session::RelaySession;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An unsigned data item in native form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataItem {
    pub data: Vec<u8>,
    pub tags: Vec<Tag>,
    pub target: Option<String>,
    pub anchor: Option<String>,
}

impl DataItem {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }

    fn encode(self) -> EncodedDataItem {
        EncodedDataItem {
            data: encoding::encode(&self.data),
            tags: self.tags,
            target: self.target,
            anchor: self.anchor,
        }
    }
}

/// Result of `dispatch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub id: String,
    /// `BASE` or `BUNDLED`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub dispatch_type: Option<String>,
}

/// One entry of `userTokens`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Wallet in a browser tab, reached through the local relay.
pub struct BrowserWallet {
    session: Arc<RelaySession>,
    service: Mutex<Option<RelayService>>,
    url: String,
}

impl BrowserWallet {
    /// Start the relay and open the signer page.
    ///
    /// Uses the system browser when `config.browser.launch` is set, otherwise
    /// only logs the URL.
    pub async fn initialize(config: RelayConfig) -> RelayResult<Self> {
        let launcher: Arc<dyn BrowserLauncher> = if config.browser.launch {
            Arc::new(SystemBrowser::new(&config.browser))
        } else {
            Arc::new(ManualBrowser::new())
        };
        Self::initialize_with(config, launcher).await
    }

    /// Start the relay and hand the page URL to `launcher`.
    ///
    /// Fails without leaving a server behind if the port cannot be bound or
    /// the launcher fails.
    pub async fn initialize_with(
        config: RelayConfig,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> RelayResult<Self> {
        let session = RelaySession::new(&config);
        let mut service = RelayService::start(&config, Arc::clone(&session)).await?;
        let url = service.url();

        if let Err(e) = launcher.launch(&url).await {
            warn!(error = %e, "Browser launch failed, stopping relay");
            session.close(SessionStatus::Failed);
            service.stop().await;
            return Err(e);
        }

        info!(url = %url, "Wallet relay ready");
        Ok(Self {
            session,
            service: Mutex::new(Some(service)),
            url,
        })
    }

    /// Signer page URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn session(&self) -> &Arc<RelaySession> {
        &self.session
    }

    /// Mark the session finished, tell the browser and stop the server.
    ///
    /// Anything still pending is rejected with [`RelayError::SessionClosed`].
    pub async fn close(&self, status: SessionStatus) {
        self.session.close(status);
        let service = self.service.lock().take();
        if let Some(mut service) = service {
            service.stop().await;
        }
    }

    async fn call<T: DeserializeOwned>(&self, operation: Operation) -> RelayResult<T> {
        let kind = operation.kind();
        debug!(kind = %kind, "Calling wallet");
        let value = self.session.request(operation).await?;
        decode_result(kind, value)
    }

    async fn call_binary(&self, operation: Operation) -> RelayResult<Vec<u8>> {
        let kind = operation.kind();
        let text: String = self.call(operation).await?;
        encoding::decode(&text).map_err(|e| RelayError::MalformedResult {
            kind,
            reason: e.to_string(),
        })
    }

    async fn call_unit(&self, operation: Operation) -> RelayResult<()> {
        self.session.request(operation).await.map(|_| ())
    }

    pub async fn connect(
        &self,
        permissions: &[Permission],
        app_info: Option<AppInfo>,
        gateway: Option<Gateway>,
    ) -> RelayResult<()> {
        self.call_unit(Operation::Connect {
            permissions: permissions.to_vec(),
            app_info,
            gateway,
        })
        .await
    }

    /// Active wallet address.
    ///
    /// Answered from the session cache once a call has succeeded; until then
    /// every call is a full round trip.
    pub async fn get_active_address(&self) -> RelayResult<String> {
        let address: String = self.call(Operation::GetActiveAddress).await?;
        self.session.cache_address(&address);
        Ok(address)
    }

    pub async fn get_all_addresses(&self) -> RelayResult<Vec<String>> {
        self.call(Operation::GetAllAddresses).await
    }

    /// Address → wallet name.
    pub async fn get_wallet_names(&self) -> RelayResult<HashMap<String, String>> {
        self.call(Operation::GetWalletNames).await
    }

    pub async fn get_permissions(&self) -> RelayResult<Vec<Permission>> {
        self.call(Operation::GetPermissions).await
    }

    pub async fn get_arweave_config(&self) -> RelayResult<Gateway> {
        self.call(Operation::GetArweaveConfig).await
    }

    pub async fn get_active_public_key(&self) -> RelayResult<String> {
        self.call(Operation::GetActivePublicKey).await
    }

    /// Raw signature over `data`.
    pub async fn signature(&self, data: &[u8], algorithm: Value) -> RelayResult<Vec<u8>> {
        self.call_binary(Operation::Signature {
            data: encoding::encode(data),
            algorithm,
        })
        .await
    }

    /// Sign `transaction` in place.
    ///
    /// Only `id`, `owner`, `reward`, `tags` and `signature` are taken from the
    /// wallet's answer.
    pub async fn sign(
        &self,
        transaction: &mut Transaction,
        options: Option<Value>,
    ) -> RelayResult<()> {
        let signed: Transaction = self
            .call(Operation::Sign {
                transaction: transaction.clone(),
                options,
            })
            .await?;
        transaction.apply_signature(signed);
        Ok(())
    }

    pub async fn dispatch(
        &self,
        transaction: &Transaction,
        options: Option<Value>,
    ) -> RelayResult<DispatchResult> {
        self.call(Operation::Dispatch {
            transaction: transaction.clone(),
            options,
        })
        .await
    }

    pub async fn encrypt(&self, data: &[u8], algorithm: Value) -> RelayResult<Vec<u8>> {
        self.call_binary(Operation::Encrypt {
            data: encoding::encode(data),
            algorithm,
        })
        .await
    }

    pub async fn decrypt(&self, data: &[u8], algorithm: Value) -> RelayResult<Vec<u8>> {
        self.call_binary(Operation::Decrypt {
            data: encoding::encode(data),
            algorithm,
        })
        .await
    }

    pub async fn private_hash(&self, data: &[u8], options: HashOptions) -> RelayResult<Vec<u8>> {
        self.call_binary(Operation::PrivateHash {
            data: encoding::encode(data),
            options,
        })
        .await
    }

    pub async fn add_token(
        &self,
        id: &str,
        token_type: Option<TokenType>,
        gateway: Option<Gateway>,
    ) -> RelayResult<()> {
        self.call_unit(Operation::AddToken {
            id: id.to_string(),
            token_type,
            gateway,
        })
        .await
    }

    pub async fn is_token_added(&self, id: &str) -> RelayResult<bool> {
        self.call(Operation::IsTokenAdded { id: id.to_string() }).await
    }

    /// Sign one data item.
    ///
    /// The returned id is computed from the signed bytes.
    pub async fn sign_data_item(&self, item: DataItem) -> RelayResult<SignedDataItem> {
        let raw = self
            .call_binary(Operation::SignDataItem {
                item: item.encode(),
            })
            .await?;
        SignedDataItem::from_raw(raw)
    }

    pub async fn batch_sign_data_item(
        &self,
        items: Vec<DataItem>,
    ) -> RelayResult<Vec<SignedDataItem>> {
        let kind = OperationKind::BatchSignDataItem;
        let expected = items.len();
        let signed: Vec<String> = self
            .call(Operation::BatchSignDataItem {
                items: items.into_iter().map(DataItem::encode).collect(),
            })
            .await?;
        if signed.len() != expected {
            return Err(RelayError::MalformedResult {
                kind,
                reason: format!("expected {} items, got {}", expected, signed.len()),
            });
        }
        signed
            .iter()
            .map(|text| {
                let raw = encoding::decode(text).map_err(|e| RelayError::MalformedResult {
                    kind,
                    reason: e.to_string(),
                })?;
                SignedDataItem::from_raw(raw)
            })
            .collect()
    }

    pub async fn sign_message(
        &self,
        data: &[u8],
        options: Option<HashOptions>,
    ) -> RelayResult<Vec<u8>> {
        self.call_binary(Operation::SignMessage {
            data: encoding::encode(data),
            options,
        })
        .await
    }

    pub async fn verify_message(
        &self,
        data: &[u8],
        signature: &[u8],
        public_key: Option<String>,
        options: Option<HashOptions>,
    ) -> RelayResult<bool> {
        self.call(Operation::VerifyMessage {
            data: encoding::encode(data),
            signature: encoding::encode(signature),
            public_key,
            options,
        })
        .await
    }

    /// Balance of token `id`, as the decimal string the wallet reports.
    pub async fn token_balance(&self, id: &str) -> RelayResult<String> {
        let value: Value = self
            .call(Operation::TokenBalance { id: id.to_string() })
            .await?;
        match value {
            Value::String(balance) => Ok(balance),
            Value::Number(balance) => Ok(balance.to_string()),
            other => Err(RelayError::MalformedResult {
                kind: OperationKind::TokenBalance,
                reason: format!("expected a balance, got {other}"),
            }),
        }
    }

    pub async fn user_tokens(&self, fetch_balance: bool) -> RelayResult<Vec<TokenInfo>> {
        self.call(Operation::UserTokens { fetch_balance }).await
    }

    pub async fn get_wander_tier_info(&self) -> RelayResult<Value> {
        self.call(Operation::GetWanderTierInfo).await
    }

    pub async fn disconnect(&self) -> RelayResult<()> {
        self.call_unit(Operation::Disconnect).await
    }
}

fn decode_result<T: DeserializeOwned>(kind: OperationKind, value: Value) -> RelayResult<T> {
    serde_json::from_value(value).map_err(|e| RelayError::MalformedResult {
        kind,
        reason: e.to_string(),
    })
}

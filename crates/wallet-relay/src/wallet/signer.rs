//! Data item signer adapter.
//!
//! Bundling code usually wants a signer it can hand a "create the unsigned
//! item" step to and get `{id, raw}` back. [`DataItemSigner`] provides that
//! shape on top of [`BrowserWallet::sign_data_item`].

use crate::domain::data_item::SignedDataItem;
use crate::domain::error::RelayResult;
use crate::wallet::{BrowserWallet, DataItem};
use std::future::Future;
use std::sync::Arc;

/// Arweave signature type tag.
pub const ARWEAVE_SIGNATURE_TYPE: u16 = 1;

/// What the create step learns about the signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerInfo {
    /// Owner public key (base64url modulus) of the active wallet.
    pub public_key: String,
    pub signature_type: u16,
    pub alg: &'static str,
}

/// Signs data items through a [`BrowserWallet`].
#[derive(Clone)]
pub struct DataItemSigner {
    wallet: Arc<BrowserWallet>,
}

impl DataItemSigner {
    pub fn new(wallet: Arc<BrowserWallet>) -> Self {
        Self { wallet }
    }

    /// Build an item with `create` and have the wallet sign it.
    pub async fn sign<F, Fut>(&self, create: F) -> RelayResult<SignedDataItem>
    where
        F: FnOnce(SignerInfo) -> Fut,
        Fut: Future<Output = RelayResult<DataItem>>,
    {
        let public_key = self.wallet.get_active_public_key().await?;
        let item = create(SignerInfo {
            public_key,
            signature_type: ARWEAVE_SIGNATURE_TYPE,
            alg: "rsa-v1_5-sha256",
        })
        .await?;
        self.wallet.sign_data_item(item).await
    }
}

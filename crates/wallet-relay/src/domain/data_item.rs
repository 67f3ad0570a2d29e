//! Content-derived identity of signed data items.
//!
//! A signed item starts with a little-endian `u16` signature type followed by
//! the raw signature; the item id is `base64url(sha256(signature))`. Nothing
//! else in the envelope is read here.

use crate::domain::encoding;
use crate::domain::error::{RelayError, RelayResult};
use sha2::{Digest, Sha256};

const SIGNATURE_TYPE_LEN: usize = 2;

/// Signature scheme recorded in a data item header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureType {
    Arweave,
    Ed25519,
    Ethereum,
    Solana,
    InjectedAptos,
    MultiAptos,
    TypedEthereum,
}

impl SignatureType {
    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            1 => Some(SignatureType::Arweave),
            2 => Some(SignatureType::Ed25519),
            3 => Some(SignatureType::Ethereum),
            4 => Some(SignatureType::Solana),
            5 => Some(SignatureType::InjectedAptos),
            6 => Some(SignatureType::MultiAptos),
            7 => Some(SignatureType::TypedEthereum),
            _ => None,
        }
    }

    /// Signature length in bytes.
    pub fn signature_len(&self) -> usize {
        match self {
            SignatureType::Arweave => 512,
            SignatureType::Ed25519 => 64,
            SignatureType::Ethereum => 65,
            SignatureType::Solana => 64,
            SignatureType::InjectedAptos => 64,
            SignatureType::MultiAptos => 64 * 32 + 4,
            SignatureType::TypedEthereum => 65,
        }
    }
}

/// A data item signed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedDataItem {
    /// Id computed from `raw`.
    pub id: String,
    /// Signed bytes exactly as the wallet returned them.
    pub raw: Vec<u8>,
}

impl SignedDataItem {
    /// Build from raw bytes, deriving the id from the signature they carry.
    pub fn from_raw(raw: Vec<u8>) -> RelayResult<Self> {
        let id = data_item_id(&raw)?;
        Ok(Self { id, raw })
    }
}

/// Slice the signature out of a signed data item.
pub fn signature_of(raw: &[u8]) -> RelayResult<&[u8]> {
    let header: [u8; SIGNATURE_TYPE_LEN] = raw
        .get(..SIGNATURE_TYPE_LEN)
        .and_then(|h| h.try_into().ok())
        .ok_or_else(|| RelayError::InvalidDataItem("missing signature type".into()))?;
    let tag = u16::from_le_bytes(header);
    let sig_type = SignatureType::from_tag(tag)
        .ok_or_else(|| RelayError::InvalidDataItem(format!("unknown signature type {}", tag)))?;

    let end = SIGNATURE_TYPE_LEN + sig_type.signature_len();
    raw.get(SIGNATURE_TYPE_LEN..end).ok_or_else(|| {
        RelayError::InvalidDataItem(format!(
            "truncated signature: need {} bytes, have {}",
            end,
            raw.len()
        ))
    })
}

/// Compute the canonical id of a signed data item.
pub fn data_item_id(raw: &[u8]) -> RelayResult<String> {
    let signature = signature_of(raw)?;
    Ok(encoding::encode_url(&Sha256::digest(signature)))
}

//! Opaque Arweave transaction description.
//!
//! The relay never builds or serializes transactions in the binary format; it
//! carries the JSON form the caller hands it and copies back what the wallet
//! fills in when signing.

use serde::{Deserialize, Serialize};

/// A name/value tag (both base64url as produced by the caller).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// JSON description of an Arweave transaction.
///
/// Only the signature-bearing fields are named; everything else the caller
/// put on the object survives untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub reward: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub signature: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Transaction {
    /// Copy the fields a signature produces from `signed` onto `self`.
    ///
    /// Fields outside `id`, `owner`, `reward`, `tags` and `signature` are left
    /// as the caller set them, even if the wallet echoed different values.
    pub fn apply_signature(&mut self, signed: Transaction) {
        self.id = signed.id;
        self.owner = signed.owner;
        self.reward = signed.reward;
        self.tags = signed.tags;
        self.signature = signed.signature;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let raw = json!({
            "format": 2,
            "target": "abc",
            "quantity": "10",
            "data_root": "root",
            "tags": [{ "name": "Q29udGVudC1UeXBl", "value": "dGV4dA" }],
        });
        let tx: Transaction = serde_json::from_value(raw).unwrap();
        assert_eq!(tx.extra["format"], 2);
        assert_eq!(tx.tags.len(), 1);

        let back = serde_json::to_value(&tx).unwrap();
        assert_eq!(back["target"], "abc");
        assert_eq!(back["data_root"], "root");
    }

    #[test]
    fn test_apply_signature_copies_only_signature_fields() {
        let mut original: Transaction = serde_json::from_value(json!({
            "quantity": "500",
            "target": "recipient",
            "reward": "1",
        }))
        .unwrap();

        let signed: Transaction = serde_json::from_value(json!({
            "id": "txid",
            "owner": "ownerkey",
            "reward": "42",
            "tags": [{ "name": "a", "value": "b" }],
            "signature": "sig",
            "quantity": "999999",
        }))
        .unwrap();

        original.apply_signature(signed);

        assert_eq!(original.id, "txid");
        assert_eq!(original.owner, "ownerkey");
        assert_eq!(original.reward, "42");
        assert_eq!(original.signature, "sig");
        assert_eq!(original.tags, vec![Tag::new("a", "b")]);
        // caller's quantity wins over the echoed one
        assert_eq!(original.extra["quantity"], "500");
        assert_eq!(original.extra["target"], "recipient");
    }
}

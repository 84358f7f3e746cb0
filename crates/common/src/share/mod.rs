//! Server-issued share records and the checks run on them
//!
//! - **[`Share`]**: the share record as delivered by the sync layer
//! - **[`VaultKey`]**: one content-encryption key epoch of a vault share
//! - **[`TrustChainValidator`]**: acceptance and vouching signature checks
//! - **[`ContentDecryptor`]**: layered decryption and signature checks of the content
//! - **[`VaultKeySelector`]**: which vault key to trust for a share
//!
//! # Wire encoding
//!
//! Signatures and encrypted blobs arrive base64-encoded and unarmored. They are
//! wrapped back into armor (`SIGNATURE` or `MESSAGE`) before they reach the
//! crypto engine, so the bytes the server sent are exactly the bytes verified.

mod content;
mod selector;
mod trust;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::crypto::{ArmorKind, CryptoEngine, CryptoError};

pub use content::{ContentDecryptor, DecryptError};
pub use selector::{ContentRotation, FirstVaultKey, LatestRotation, VaultKeySelector};
pub use trust::{
    TrustChainValidator, TrustError, VerifiedSigningKey, VerifiedTrust, VerifiedVaultKey,
};

/// What a share grants access to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TargetType {
    Vault,
    Label,
    Item,
}

impl TryFrom<u8> for TargetType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TargetType::Vault),
            2 => Ok(TargetType::Label),
            3 => Ok(TargetType::Item),
            other => Err(format!("unknown share target type {}", other)),
        }
    }
}

impl From<TargetType> for u8 {
    fn from(target: TargetType) -> Self {
        match target {
            TargetType::Vault => 1,
            TargetType::Label => 2,
            TargetType::Item => 3,
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetType::Vault => write!(f, "vault"),
            TargetType::Label => write!(f, "label"),
            TargetType::Item => write!(f, "item"),
        }
    }
}

/// A share record
///
/// Immutable once received. Field names follow the server's JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Share {
    #[serde(rename = "ShareID")]
    pub share_id: String,
    #[serde(rename = "VaultID")]
    pub vault_id: String,
    pub target_type: TargetType,
    #[serde(rename = "TargetID")]
    pub target_id: String,
    #[serde(default)]
    pub permission: u16,
    /// Base64 signature by the current user over the signing key fingerprint
    pub acceptance_signature: String,
    #[serde(default)]
    pub inviter_email: String,
    /// Base64 signature by the inviter over the signing key fingerprint
    #[serde(default)]
    pub inviter_acceptance_signature: String,
    /// Armored signing key; private when the user administers the share
    pub signing_key: String,
    /// Base64 encrypted passphrase of the signing key, admins only
    #[serde(default)]
    pub signing_key_passphrase: Option<String>,
    /// Base64 encrypted content, absent for item shares
    #[serde(default)]
    pub content: Option<String>,
    #[serde(rename = "ContentRotationID", default)]
    pub content_rotation_id: String,
    #[serde(default)]
    pub content_encrypted_address_signature: String,
    #[serde(default)]
    pub content_encrypted_vault_signature: String,
    #[serde(default)]
    pub content_signature_email: String,
    #[serde(default)]
    pub content_format_version: u16,
    /// Unix seconds
    #[serde(default)]
    pub expire_time: Option<i64>,
    /// Unix seconds
    #[serde(default)]
    pub create_time: i64,
}

impl Share {
    /// Whether the user administers this share, i.e. holds the signing key passphrase
    pub fn is_admin(&self) -> bool {
        self.signing_key_passphrase.is_some()
    }

    pub fn is_expired(&self, at: OffsetDateTime) -> bool {
        self.expire_time
            .map(|expire| expire <= at.unix_timestamp())
            .unwrap_or(false)
    }
}

/// A vault key for one content rotation epoch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VaultKey {
    #[serde(rename = "RotationID", default)]
    pub rotation_id: String,
    #[serde(default)]
    pub rotation: u32,
    /// Armored, locked vault key
    pub key: String,
    /// Base64 signature by the share signing key over this key's fingerprint
    pub key_signature: String,
    /// Base64 encrypted passphrase of `key`, encrypted to the user's address keys
    #[serde(default)]
    pub key_passphrase: Option<String>,
    #[serde(default)]
    pub create_time: i64,
}

/// A share together with the vault keys fetched for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShareBundle {
    pub share: Share,
    #[serde(default)]
    pub vault_keys: Vec<VaultKey>,
}

/// Decode a base64 wire blob and wrap it in armor of the given kind
pub fn armor_wire<E: CryptoEngine>(
    engine: &E,
    encoded: &str,
    kind: ArmorKind,
) -> Result<String, CryptoError> {
    let raw = BASE64
        .decode(encoded.trim())
        .map_err(|e| CryptoError::Armor(format!("invalid base64 {} blob: {}", kind, e)))?;
    Ok(engine.armor(&raw, kind))
}

/// Strip the armor of a blob and encode it for the wire
pub fn wire_encode<E: CryptoEngine>(
    engine: &E,
    armored: &str,
    kind: ArmorKind,
) -> Result<String, CryptoError> {
    Ok(BASE64.encode(engine.dearmor(armored, kind)?))
}

#[cfg(test)]
mod test {
    use super::*;

    const SHARE_JSON: &str = r#"{
        "ShareID": "share-1",
        "VaultID": "vault-1",
        "TargetType": 1,
        "TargetID": "vault-1",
        "Permission": 0,
        "AcceptanceSignature": "c2ln",
        "InviterEmail": "admin@example.com",
        "InviterAcceptanceSignature": "c2ln",
        "SigningKey": "-----BEGIN PUBLIC KEY-----\n-----END PUBLIC KEY-----\n",
        "SigningKeyPassphrase": null,
        "Content": "Y29udGVudA==",
        "ContentRotationID": "rot-1",
        "ContentEncryptedAddressSignature": "YQ==",
        "ContentEncryptedVaultSignature": "dg==",
        "ContentSignatureEmail": "admin@example.com",
        "ContentFormatVersion": 1,
        "ExpireTime": null,
        "CreateTime": 1700000000
    }"#;

    #[test]
    fn test_share_from_server_json() {
        let share: Share = serde_json::from_str(SHARE_JSON).unwrap();
        assert_eq!(share.share_id, "share-1");
        assert_eq!(share.target_type, TargetType::Vault);
        assert_eq!(share.content_rotation_id, "rot-1");
        assert_eq!(share.content_format_version, 1);
        assert!(!share.is_admin());
        assert!(!share.is_expired(OffsetDateTime::now_utc()));

        let json = serde_json::to_value(&share).unwrap();
        assert_eq!(json["ShareID"], "share-1");
        assert_eq!(json["TargetType"], 1);
    }

    #[test]
    fn test_unknown_target_type() {
        let json = SHARE_JSON.replace("\"TargetType\": 1", "\"TargetType\": 7");
        assert!(serde_json::from_str::<Share>(&json).is_err());
    }

    #[test]
    fn test_expiry() {
        let mut share: Share = serde_json::from_str(SHARE_JSON).unwrap();
        let now = OffsetDateTime::now_utc();
        share.expire_time = Some(now.unix_timestamp() - 1);
        assert!(share.is_expired(now));
        share.expire_time = Some(now.unix_timestamp() + 60);
        assert!(!share.is_expired(now));
    }

    #[test]
    fn test_admin_holds_signing_key_passphrase() {
        let mut share: Share = serde_json::from_str(SHARE_JSON).unwrap();
        share.signing_key_passphrase = Some("cGFzcw==".into());
        assert!(share.is_admin());
    }

    #[test]
    fn test_armor_wire_rejects_bad_base64() {
        let engine = crate::crypto::NativeEngine::default();
        let err = armor_wire(&engine, "not base64!", ArmorKind::Signature).unwrap_err();
        assert!(matches!(err, CryptoError::Armor(_)));
    }
}

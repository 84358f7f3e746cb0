//! Timestamped detached signatures
//!
//! A detached signature covers `created_at (i64 BE) || data` and records its
//! creation time next to the Ed25519 signature. Verification takes an explicit
//! verification time and refuses signatures that claim to be from later than
//! that instant.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::armor::{armor, dearmor, ArmorKind};
use super::engine::CryptoError;
use super::keys::{PublicKey, SecretKey};

#[derive(Serialize, Deserialize)]
struct SignaturePacket {
    created_at: i64,
    signature: ed25519_dalek::Signature,
}

fn covered_bytes(created_at: i64, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + data.len());
    out.extend_from_slice(&created_at.to_be_bytes());
    out.extend_from_slice(data);
    out
}

/// Sign `data` and armor the result as a `SIGNATURE` block
pub fn sign_detached(
    key: &SecretKey,
    data: &[u8],
    at: OffsetDateTime,
) -> Result<String, CryptoError> {
    let created_at = at.unix_timestamp();
    let packet = SignaturePacket {
        created_at,
        signature: key.sign(&covered_bytes(created_at, data)),
    };
    let raw = bincode::serialize(&packet)
        .map_err(|e| anyhow::anyhow!("failed to encode signature: {}", e))?;
    Ok(armor(&raw, ArmorKind::Signature))
}

/// Verify an armored detached signature against any of `keys`
pub fn verify_detached(
    keys: &[PublicKey],
    data: &[u8],
    armored_signature: &str,
    verify_time: OffsetDateTime,
) -> Result<(), CryptoError> {
    if keys.is_empty() {
        return Err(CryptoError::NoVerifier);
    }

    let raw = dearmor(armored_signature, ArmorKind::Signature)?;
    let packet: SignaturePacket = bincode::deserialize(&raw)
        .map_err(|e| CryptoError::Armor(format!("malformed signature: {}", e)))?;

    let verify_at = verify_time.unix_timestamp();
    if packet.created_at > verify_at {
        return Err(CryptoError::SignatureFromFuture {
            created: packet.created_at,
            verify_time: verify_at,
        });
    }

    let covered = covered_bytes(packet.created_at, data);
    if keys
        .iter()
        .any(|key| key.verify(&covered, &packet.signature).is_ok())
    {
        Ok(())
    } else {
        Err(CryptoError::BadSignature)
    }
}

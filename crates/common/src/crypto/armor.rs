//! Text armoring for binary key, signature and message blobs
//!
//! The server moves signatures and ciphertexts around as base64; the crypto
//! layer works on armored text. Armor is a PEM block whose tag names the
//! blob kind, so a signature can never be fed where a message is expected.

use serde::{Deserialize, Serialize};

use super::engine::CryptoError;

/// The kinds of blob that can be armored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArmorKind {
    Signature,
    Message,
    PublicKey,
    PrivateKey,
}

impl ArmorKind {
    /// The PEM tag written for this kind
    pub fn tag(&self) -> &'static str {
        match self {
            ArmorKind::Signature => "SIGNATURE",
            ArmorKind::Message => "MESSAGE",
            ArmorKind::PublicKey => "PUBLIC KEY",
            ArmorKind::PrivateKey => "ENCRYPTED PRIVATE KEY",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "SIGNATURE" => Some(ArmorKind::Signature),
            "MESSAGE" => Some(ArmorKind::Message),
            "PUBLIC KEY" => Some(ArmorKind::PublicKey),
            "ENCRYPTED PRIVATE KEY" => Some(ArmorKind::PrivateKey),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArmorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Wrap raw bytes in an armored block of the given kind
pub fn armor(raw: &[u8], kind: ArmorKind) -> String {
    pem::encode(&pem::Pem::new(kind.tag(), raw))
}

/// Strip the armor off a block, checking that it has the expected kind
pub fn dearmor(armored: &str, kind: ArmorKind) -> Result<Vec<u8>, CryptoError> {
    let (found, contents) = dearmor_any(armored)?;
    if found != kind {
        return Err(CryptoError::Armor(format!(
            "expected {} block, found {}",
            kind, found
        )));
    }
    Ok(contents)
}

/// Strip the armor off a block of any known kind
pub fn dearmor_any(armored: &str) -> Result<(ArmorKind, Vec<u8>), CryptoError> {
    let pem = pem::parse(armored).map_err(|e| CryptoError::Armor(e.to_string()))?;
    let kind = ArmorKind::from_tag(pem.tag())
        .ok_or_else(|| CryptoError::Armor(format!("unknown armor tag: {}", pem.tag())))?;
    Ok((kind, pem.contents().to_vec()))
}

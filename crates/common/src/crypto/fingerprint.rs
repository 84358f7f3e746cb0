//! Key fingerprints
//!
//! A fingerprint is the SHA-256 digest of a key's full public material. Both
//! trust-chain signatures (acceptance and vouching) sign the lowercase hex
//! form of a fingerprint, so [`Fingerprint::signed_payload`] must produce the
//! same bytes on the signing and the verifying side.

use sha2::{Digest, Sha256};

/// Size of a fingerprint digest in bytes
pub const FINGERPRINT_SIZE: usize = 32;

/// Canonical digest of a key's public material
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_SIZE]);

impl Fingerprint {
    /// Digest raw public key material
    pub fn digest(public_material: &[u8]) -> Self {
        let mut out = [0u8; FINGERPRINT_SIZE];
        out.copy_from_slice(&Sha256::digest(public_material));
        Self(out)
    }

    /// Parse a fingerprint from its hex form
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let mut buff = [0u8; FINGERPRINT_SIZE];
        hex::decode_to_slice(hex, &mut buff)?;
        Ok(Self(buff))
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_SIZE] {
        &self.0
    }

    /// Lowercase hex, the textual form of the fingerprint
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The bytes covered by acceptance and vouching signatures
    pub fn signed_payload(&self) -> Vec<u8> {
        self.to_hex().into_bytes()
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

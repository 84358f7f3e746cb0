use time::OffsetDateTime;
use zeroize::Zeroizing;

use super::armor::{self, ArmorKind};
use super::fingerprint::Fingerprint;

/// Errors raised by a crypto backend
///
/// The pipeline maps these onto its own, step-specific errors; the variants
/// here only need to be precise enough for logging and tests.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("crypto error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("armor error: {0}")]
    Armor(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("failed to unlock private key")]
    Unlock,
    #[error("failed to decrypt message")]
    Decrypt,
    #[error("signature verification failed")]
    BadSignature,
    #[error("signature created at {created} is after verification time {verify_time}")]
    SignatureFromFuture { created: i64, verify_time: i64 },
    #[error("no verification key available")]
    NoVerifier,
    #[error("no key in the ring could decrypt the message")]
    NoMatchingKey,
}

/// The asymmetric-crypto capabilities the share pipeline relies on
///
/// Everything crossing this boundary is armored text or raw bytes, so a
/// backend can be swapped (or faked in tests) without touching the trust
/// chain or the content decryptor. Implementations must be cheap to clone and
/// hold no mutable state: the pipeline calls them from many workers at once.
pub trait CryptoEngine: Clone + Send + Sync + 'static {
    /// An unlocked private key
    type PrivateKey: Send + Sync + 'static;
    /// A public key usable for verification and encryption
    type PublicKey: Clone + Send + Sync + 'static;

    /// Fingerprint of an armored key, private or public form
    fn fingerprint(&self, armored_key: &str) -> Result<Fingerprint, CryptoError>;

    fn armor(&self, raw: &[u8], kind: ArmorKind) -> String {
        armor::armor(raw, kind)
    }

    fn dearmor(&self, armored: &str, kind: ArmorKind) -> Result<Vec<u8>, CryptoError> {
        armor::dearmor(armored, kind)
    }

    /// Public component of an armored key, private or public form
    fn public_key(&self, armored_key: &str) -> Result<Self::PublicKey, CryptoError>;

    /// Unlock an armored private key with its passphrase
    fn unlock(&self, armored_key: &str, passphrase: &[u8]) -> Result<Self::PrivateKey, CryptoError>;

    fn public_of(&self, key: &Self::PrivateKey) -> Self::PublicKey;

    /// Produce an armored detached signature over `data`, stamped with `at`
    fn sign(
        &self,
        key: &Self::PrivateKey,
        data: &[u8],
        at: OffsetDateTime,
    ) -> Result<String, CryptoError>;

    /// Verify an armored detached signature against any of `keys`
    ///
    /// Signatures stamped after `verify_time` are rejected.
    fn verify_detached(
        &self,
        keys: &[Self::PublicKey],
        data: &[u8],
        armored_signature: &str,
        verify_time: OffsetDateTime,
    ) -> Result<(), CryptoError>;

    /// Encrypt `data` to `recipient`, returning an armored message
    fn encrypt(&self, recipient: &Self::PublicKey, data: &[u8]) -> Result<String, CryptoError>;

    /// Decrypt an armored message with an unlocked key
    fn decrypt(
        &self,
        key: &Self::PrivateKey,
        armored_message: &str,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError>;
}

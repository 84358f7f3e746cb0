//! Messages encrypted to a public key using ECDH + ChaCha20-Poly1305
//!
//! To seal a message for a recipient:
//! 1. **Generate ephemeral keypair**: a throwaway Ed25519 key
//! 2. **Perform ECDH**: convert both keys to X25519 and compute the shared secret
//! 3. **Derive**: run the shared secret and both public keys through BLAKE3's KDF
//! 4. **Seal**: encrypt the payload with the derived [`Secret`]
//!
//! The recipient repeats the ECDH with their private key and the ephemeral
//! public key carried in the message.
//!
//! # Wire Format
//!
//! ```text
//! bincode { ephemeral: [u8; 32], ciphertext: nonce || sealed || tag }
//! ```
//!
//! armored as a `MESSAGE` block.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::armor::{armor, dearmor, ArmorKind};
use super::engine::CryptoError;
use super::keys::{PublicKey, SecretKey, PUBLIC_KEY_SIZE};
use super::secret::Secret;

const MESSAGE_KDF_CONTEXT: &str = "pass-share 2024 sealed message v1";

/// A payload encrypted to a single recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedMessage {
    ephemeral: [u8; PUBLIC_KEY_SIZE],
    ciphertext: Vec<u8>,
}

fn message_secret(shared: &[u8], ephemeral: &PublicKey, recipient: &PublicKey) -> Secret {
    let mut material = Zeroizing::new(Vec::with_capacity(shared.len() + 2 * PUBLIC_KEY_SIZE));
    material.extend_from_slice(shared);
    material.extend_from_slice(&ephemeral.to_bytes());
    material.extend_from_slice(&recipient.to_bytes());
    Secret::derive(MESSAGE_KDF_CONTEXT, &material)
}

impl SealedMessage {
    /// Encrypt `data` so that only `recipient` can open it
    pub fn seal(data: &[u8], recipient: &PublicKey) -> Result<Self, CryptoError> {
        let ephemeral_private = SecretKey::generate()?;
        let ephemeral_public = ephemeral_private.public();

        let shared = ephemeral_private
            .to_x25519()
            .diffie_hellman(&recipient.to_x25519()?);
        let secret = message_secret(shared.as_bytes(), &ephemeral_public, recipient);

        let ciphertext = secret
            .encrypt(data)
            .map_err(|e| anyhow::anyhow!("failed to seal message: {}", e))?;

        Ok(Self {
            ephemeral: ephemeral_public.to_bytes(),
            ciphertext,
        })
    }

    /// Recover the payload with the recipient's private key
    ///
    /// Any failure (wrong recipient, corrupted data) is reported as
    /// [`CryptoError::Decrypt`] and yields no plaintext.
    pub fn open(&self, recipient_secret: &SecretKey) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let ephemeral_public = PublicKey::try_from(self.ephemeral.as_slice())?;
        let shared = recipient_secret
            .to_x25519()
            .diffie_hellman(&ephemeral_public.to_x25519()?);
        let secret = message_secret(
            shared.as_bytes(),
            &ephemeral_public,
            &recipient_secret.public(),
        );

        secret
            .decrypt(&self.ciphertext)
            .map_err(|_| CryptoError::Decrypt)
    }

    pub fn to_armored(&self) -> Result<String, CryptoError> {
        let raw = bincode::serialize(self)
            .map_err(|e| anyhow::anyhow!("failed to encode message: {}", e))?;
        Ok(armor(&raw, ArmorKind::Message))
    }

    pub fn from_armored(armored: &str) -> Result<Self, CryptoError> {
        let raw = dearmor(armored, ArmorKind::Message)?;
        bincode::deserialize(&raw).map_err(|_| CryptoError::Decrypt)
    }
}

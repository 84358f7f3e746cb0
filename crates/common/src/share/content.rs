use time::{Duration, OffsetDateTime};
use zeroize::Zeroizing;

use super::trust::VerifiedVaultKey;
use super::{armor_wire, Share};
use crate::crypto::{ArmorKind, CryptoEngine, CryptoError};
use crate::keyring::{KeyRing, PublicKeyDirectory};

#[derive(Debug, thiserror::Error)]
pub enum DecryptError {
    #[error("share has no content")]
    MissingContent,
    #[error("vault key carries no passphrase")]
    MissingPassphrase,
    #[error("failed to decrypt share content: {0}")]
    DecryptionFailed(#[source] CryptoError),
    #[error("content signature mismatch: {0}")]
    SignatureMismatch(#[source] CryptoError),
}

/// Decrypted content signatures are armored text, passed on unchanged
fn armored_signature(plain: &[u8]) -> Result<&str, DecryptError> {
    std::str::from_utf8(plain).map_err(|e| {
        DecryptError::SignatureMismatch(CryptoError::Armor(format!(
            "signature is not armored text: {}",
            e
        )))
    })
}

/// Opens the encrypted content of a vault share
///
/// The content and its two signatures (one by the signer's address key, one by
/// the vault key) are all encrypted to the vault key. Plaintext is only
/// returned once both signatures verify over it; on any failure it is dropped,
/// and zeroed, before the error is returned.
#[derive(Debug, Clone)]
pub struct ContentDecryptor<E> {
    engine: E,
    clock_skew: Duration,
}

impl<E: CryptoEngine> ContentDecryptor<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            clock_skew: Duration::ZERO,
        }
    }

    pub fn with_clock_skew(mut self, secs: u64) -> Self {
        self.clock_skew = Duration::seconds(secs.min(i64::MAX as u64) as i64);
        self
    }

    /// Recover the passphrase of a vault key with the session key ring
    pub fn vault_passphrase(
        &self,
        vault_key: &VerifiedVaultKey<E>,
        ring: &KeyRing<E>,
    ) -> Result<Zeroizing<Vec<u8>>, DecryptError> {
        let encrypted = vault_key
            .key()
            .key_passphrase
            .as_deref()
            .ok_or(DecryptError::MissingPassphrase)?;
        let message = armor_wire(&self.engine, encrypted, ArmorKind::Message)
            .map_err(DecryptError::DecryptionFailed)?;
        ring.decrypt(&message).map_err(DecryptError::DecryptionFailed)
    }

    fn open_blob(
        &self,
        key: &E::PrivateKey,
        encoded: &str,
    ) -> Result<Zeroizing<Vec<u8>>, DecryptError> {
        let message = armor_wire(&self.engine, encoded, ArmorKind::Message)
            .map_err(DecryptError::DecryptionFailed)?;
        self.engine
            .decrypt(key, &message)
            .map_err(DecryptError::DecryptionFailed)
    }

    /// Decrypt the share content and verify both content signatures
    ///
    /// The address signature is checked against the keys `signers` knows for
    /// the share's content signature email; the vault signature against the
    /// vault key itself.
    pub fn decrypt(
        &self,
        share: &Share,
        vault_key: &VerifiedVaultKey<E>,
        vault_passphrase: &[u8],
        signers: &dyn PublicKeyDirectory<E::PublicKey>,
        verify_time: OffsetDateTime,
    ) -> Result<Zeroizing<Vec<u8>>, DecryptError> {
        let content = share
            .content
            .as_deref()
            .ok_or(DecryptError::MissingContent)?;

        let key = self
            .engine
            .unlock(&vault_key.key().key, vault_passphrase)
            .map_err(DecryptError::DecryptionFailed)?;

        let plain_content = self.open_blob(&key, content)?;
        let address_signature =
            self.open_blob(&key, &share.content_encrypted_address_signature)?;
        let vault_signature = self.open_blob(&key, &share.content_encrypted_vault_signature)?;
        drop(key);

        let signature_time = verify_time.saturating_add(self.clock_skew);

        let signer_keys = signers.public_keys_for(&share.content_signature_email);
        self.engine
            .verify_detached(
                &signer_keys,
                &plain_content,
                armored_signature(&address_signature)?,
                signature_time,
            )
            .map_err(DecryptError::SignatureMismatch)?;

        self.engine
            .verify_detached(
                std::slice::from_ref(vault_key.public_key()),
                &plain_content,
                armored_signature(&vault_signature)?,
                signature_time,
            )
            .map_err(DecryptError::SignatureMismatch)?;

        tracing::debug!(
            share_id = %share.share_id,
            signer = %share.content_signature_email,
            "share content decrypted and verified"
        );
        Ok(plain_content)
    }
}

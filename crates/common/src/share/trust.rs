//! Two-hop trust chain of a share
//!
//! 1. **Acceptance**: the user signed the fingerprint of the share's signing
//!    key when joining the share. Checked against the user's own keys.
//! 2. **Vouching**: the signing key signed the fingerprint of the vault key.
//!    Checked against the signing key's public part.
//!
//! Both checks produce proof types ([`VerifiedSigningKey`],
//! [`VerifiedVaultKey`]) that can only be built here, so code further down the
//! pipeline cannot be handed a key that skipped a check.

use time::{Duration, OffsetDateTime};
use zeroize::Zeroizing;

use super::selector::VaultKeySelector;
use super::{armor_wire, Share, VaultKey};
use crate::crypto::{ArmorKind, CryptoEngine, CryptoError, Fingerprint};
use crate::keyring::KeyRing;

#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    #[error("acceptance signature is invalid: {0}")]
    AcceptanceInvalid(#[source] CryptoError),
    #[error("vault key is not vouched for by the signing key: {0}")]
    VaultKeyUnvouched(#[source] CryptoError),
    #[error("share has no usable vault key")]
    NoVaultKey,
    #[error("share expired at {0}")]
    ShareExpired(i64),
    #[error("failed to decrypt signing key passphrase: {0}")]
    SigningKeyPassphrase(#[source] CryptoError),
}

/// A signing key the user is known to have accepted
pub struct VerifiedSigningKey<E: CryptoEngine> {
    armored: String,
    fingerprint: Fingerprint,
    public: E::PublicKey,
    passphrase: Option<Zeroizing<Vec<u8>>>,
}

impl<E: CryptoEngine> VerifiedSigningKey<E> {
    pub fn armored(&self) -> &str {
        &self.armored
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn public_key(&self) -> &E::PublicKey {
        &self.public
    }

    /// Passphrase of the signing key, only known to share admins
    pub fn passphrase(&self) -> Option<&[u8]> {
        self.passphrase.as_deref().map(Vec::as_slice)
    }
}

impl<E: CryptoEngine> std::fmt::Debug for VerifiedSigningKey<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifiedSigningKey")
            .field("fingerprint", &self.fingerprint)
            .field("admin", &self.passphrase.is_some())
            .finish()
    }
}

/// A vault key vouched for by an accepted signing key
pub struct VerifiedVaultKey<E: CryptoEngine> {
    key: VaultKey,
    fingerprint: Fingerprint,
    public: E::PublicKey,
}

impl<E: CryptoEngine> VerifiedVaultKey<E> {
    pub fn key(&self) -> &VaultKey {
        &self.key
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn public_key(&self) -> &E::PublicKey {
        &self.public
    }
}

impl<E: CryptoEngine> std::fmt::Debug for VerifiedVaultKey<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifiedVaultKey")
            .field("rotation_id", &self.key.rotation_id)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// Outcome of a full trust-chain validation
#[derive(Debug)]
pub struct VerifiedTrust<E: CryptoEngine> {
    pub signing_key: VerifiedSigningKey<E>,
    pub vault_key: VerifiedVaultKey<E>,
}

#[derive(Debug, Clone)]
pub struct TrustChainValidator<E> {
    engine: E,
    clock_skew: Duration,
    enforce_expiry: bool,
}

impl<E: CryptoEngine> TrustChainValidator<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            clock_skew: Duration::ZERO,
            enforce_expiry: true,
        }
    }

    /// Accept signatures created up to `secs` after the verification time
    pub fn with_clock_skew(mut self, secs: u64) -> Self {
        self.clock_skew = Duration::seconds(secs.min(i64::MAX as u64) as i64);
        self
    }

    pub fn with_expiry(mut self, enforce: bool) -> Self {
        self.enforce_expiry = enforce;
        self
    }

    fn signature_time(&self, verify_time: OffsetDateTime) -> OffsetDateTime {
        verify_time.saturating_add(self.clock_skew)
    }

    /// Check that the user accepted the share's signing key
    pub fn verify_acceptance(
        &self,
        share: &Share,
        ring: &KeyRing<E>,
        verify_time: OffsetDateTime,
    ) -> Result<VerifiedSigningKey<E>, TrustError> {
        let fingerprint = self
            .engine
            .fingerprint(&share.signing_key)
            .map_err(TrustError::AcceptanceInvalid)?;
        let public = self
            .engine
            .public_key(&share.signing_key)
            .map_err(TrustError::AcceptanceInvalid)?;
        let signature = armor_wire(&self.engine, &share.acceptance_signature, ArmorKind::Signature)
            .map_err(TrustError::AcceptanceInvalid)?;

        self.engine
            .verify_detached(
                &ring.public_keys(),
                &fingerprint.signed_payload(),
                &signature,
                self.signature_time(verify_time),
            )
            .map_err(TrustError::AcceptanceInvalid)?;

        tracing::debug!(
            share_id = %share.share_id,
            signing_key = %fingerprint,
            "acceptance signature verified"
        );
        Ok(VerifiedSigningKey {
            armored: share.signing_key.clone(),
            fingerprint,
            public,
            passphrase: None,
        })
    }

    /// Check that an accepted signing key vouches for `vault_key`
    pub fn verify_vault_key(
        &self,
        signing_key: &VerifiedSigningKey<E>,
        vault_key: &VaultKey,
        verify_time: OffsetDateTime,
    ) -> Result<VerifiedVaultKey<E>, TrustError> {
        let fingerprint = self
            .engine
            .fingerprint(&vault_key.key)
            .map_err(TrustError::VaultKeyUnvouched)?;
        let public = self
            .engine
            .public_key(&vault_key.key)
            .map_err(TrustError::VaultKeyUnvouched)?;
        let signature = armor_wire(&self.engine, &vault_key.key_signature, ArmorKind::Signature)
            .map_err(TrustError::VaultKeyUnvouched)?;

        self.engine
            .verify_detached(
                std::slice::from_ref(signing_key.public_key()),
                &fingerprint.signed_payload(),
                &signature,
                self.signature_time(verify_time),
            )
            .map_err(TrustError::VaultKeyUnvouched)?;

        tracing::debug!(
            rotation_id = %vault_key.rotation_id,
            vault_key = %fingerprint,
            "vault key vouched for"
        );
        Ok(VerifiedVaultKey {
            key: vault_key.clone(),
            fingerprint,
            public,
        })
    }

    /// Run the whole chain: expiry, acceptance, key selection and vouching
    ///
    /// For admin shares the signing key passphrase is decrypted once both
    /// signatures hold.
    pub fn validate(
        &self,
        share: &Share,
        vault_keys: &[VaultKey],
        selector: &dyn VaultKeySelector,
        ring: &KeyRing<E>,
        verify_time: OffsetDateTime,
    ) -> Result<VerifiedTrust<E>, TrustError> {
        if self.enforce_expiry && share.is_expired(verify_time) {
            return Err(TrustError::ShareExpired(share.expire_time.unwrap_or_default()));
        }

        let mut signing_key = self.verify_acceptance(share, ring, verify_time)?;

        let candidate = selector
            .select(share, vault_keys)
            .ok_or(TrustError::NoVaultKey)?;
        let vault_key = self.verify_vault_key(&signing_key, candidate, verify_time)?;

        if let Some(encrypted) = &share.signing_key_passphrase {
            let message = armor_wire(&self.engine, encrypted, ArmorKind::Message)
                .map_err(TrustError::SigningKeyPassphrase)?;
            let passphrase = ring
                .decrypt(&message)
                .map_err(TrustError::SigningKeyPassphrase)?;
            signing_key.passphrase = Some(passphrase);
        }

        Ok(VerifiedTrust {
            signing_key,
            vault_key,
        })
    }
}

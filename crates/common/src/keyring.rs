//! # Key rings
//!
//! A [`KeyRing`] is the session's set of unlocked address keys. It is built
//! once per session by [`KeyRingBuilder`] and then shared read-only (behind an
//! `Arc`) by every pipeline invocation.
//!
//! The ring is a capability object: callers can ask it to sign, to decrypt,
//! or for the public keys of an address, but unlocked key material and
//! passphrases never leave it.
//!
//! ## Unlocking address keys
//!
//! Each address key is locked under its own passphrase:
//! - if the key carries a **token**, the passphrase is the token decrypted
//!   with the user's primary key (itself unlocked with the mailbox passphrase)
//! - otherwise the mailbox passphrase is used directly
//!
//! A key that cannot be unlocked is skipped and recorded; other keys of the
//! same address may still satisfy trust-chain checks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use zeroize::Zeroizing;

use crate::crypto::{CryptoEngine, CryptoError};

/// One locked address key, as handed over by the session collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressKey {
    #[serde(rename = "ID", default)]
    pub id: String,
    /// Armored, locked private key
    pub private_key: String,
    /// Armored message holding the key passphrase, encrypted to the primary user key
    #[serde(default)]
    pub token: Option<String>,
}

/// An address of the user with its keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Address {
    #[serde(rename = "ID")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub keys: Vec<AddressKey>,
}

/// Everything needed to build a session key ring, apart from the mailbox passphrase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserKeys {
    /// Armored, locked user keys; the first one is the primary key
    #[serde(default)]
    pub user_keys: Vec<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
}

impl UserKeys {
    pub fn primary_key(&self) -> Option<&str> {
        self.user_keys.first().map(String::as_str)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeyDerivationError {
    #[error("user has no primary key")]
    NoPrimaryKey,
    #[error("user has no address")]
    NoAddress,
    #[error("failed to unlock primary key: {0}")]
    PrimaryKeyLocked(#[source] CryptoError),
    #[error("failed to unlock key {key_id} of {email}: {source}")]
    AddressKey {
        email: String,
        key_id: String,
        #[source]
        source: CryptoError,
    },
    #[error("no address key could be unlocked")]
    NoUsableKeys,
}

/// Lookup of verification keys by email address
///
/// Used to find the keys of a content signer. The session [`KeyRing`] is a
/// directory for the user's own addresses; other users' keys can be supplied
/// through [`StaticDirectory`] or any other implementation.
pub trait PublicKeyDirectory<K>: Send + Sync {
    fn public_keys_for(&self, email: &str) -> Vec<K>;
}

/// In-memory [`PublicKeyDirectory`], keyed by case-insensitive email
#[derive(Debug, Clone)]
pub struct StaticDirectory<K> {
    keys: HashMap<String, Vec<K>>,
}

impl<K> Default for StaticDirectory<K> {
    fn default() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }
}

impl<K: Clone + Send + Sync> StaticDirectory<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, email: &str, key: K) {
        self.keys
            .entry(email.to_ascii_lowercase())
            .or_default()
            .push(key);
    }
}

impl<K: Clone + Send + Sync> PublicKeyDirectory<K> for StaticDirectory<K> {
    fn public_keys_for(&self, email: &str) -> Vec<K> {
        self.keys
            .get(&email.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

struct KeyRingEntry<E: CryptoEngine> {
    address_id: String,
    email: String,
    key_id: String,
    key: E::PrivateKey,
    public: E::PublicKey,
}

/// The session's unlocked address keys
pub struct KeyRing<E: CryptoEngine> {
    engine: E,
    entries: Vec<KeyRingEntry<E>>,
    skipped: Vec<KeyDerivationError>,
}

impl<E: CryptoEngine> std::fmt::Debug for KeyRing<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field(
                "keys",
                &self
                    .entries
                    .iter()
                    .map(|e| format!("{}/{}", e.email, e.key_id))
                    .collect::<Vec<_>>(),
            )
            .field("skipped", &self.skipped.len())
            .finish()
    }
}

impl<E: CryptoEngine> KeyRing<E> {
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys that were excluded while building the ring
    pub fn skipped(&self) -> &[KeyDerivationError] {
        &self.skipped
    }

    /// Address ids covered by the ring, in ring order, without duplicates
    pub fn address_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !ids.contains(&entry.address_id.as_str()) {
                ids.push(entry.address_id.as_str());
            }
        }
        ids
    }

    /// Public keys of every unlocked key in the ring
    pub fn public_keys(&self) -> Vec<E::PublicKey> {
        self.entries.iter().map(|e| e.public.clone()).collect()
    }

    /// Sign with the first key of the ring
    pub fn sign(&self, data: &[u8], at: OffsetDateTime) -> Result<String, CryptoError> {
        let entry = self.entries.first().ok_or(CryptoError::NoMatchingKey)?;
        self.engine.sign(&entry.key, data, at)
    }

    /// Sign with the first key of the address `email`
    pub fn sign_as(
        &self,
        email: &str,
        data: &[u8],
        at: OffsetDateTime,
    ) -> Result<String, CryptoError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.email.eq_ignore_ascii_case(email))
            .ok_or(CryptoError::NoMatchingKey)?;
        self.engine.sign(&entry.key, data, at)
    }

    /// Decrypt an armored message with whichever key of the ring it was sent to
    pub fn decrypt(&self, armored_message: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        for entry in &self.entries {
            if let Ok(plain) = self.engine.decrypt(&entry.key, armored_message) {
                return Ok(plain);
            }
        }
        Err(CryptoError::NoMatchingKey)
    }
}

impl<E: CryptoEngine> PublicKeyDirectory<E::PublicKey> for KeyRing<E> {
    fn public_keys_for(&self, email: &str) -> Vec<E::PublicKey> {
        self.entries
            .iter()
            .filter(|e| e.email.eq_ignore_ascii_case(email))
            .map(|e| e.public.clone())
            .collect()
    }
}

/// Builds a [`KeyRing`] from the user's locked keys
#[derive(Debug, Clone)]
pub struct KeyRingBuilder<E> {
    engine: E,
}

impl<E: CryptoEngine> KeyRingBuilder<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Build a ring from the output of the session collaborator
    pub fn build_for(
        &self,
        user: &UserKeys,
        mailbox_passphrase: &[u8],
    ) -> Result<KeyRing<E>, KeyDerivationError> {
        self.build(&user.addresses, mailbox_passphrase, user.primary_key())
    }

    /// Unlock every address key that can be unlocked
    ///
    /// # Errors
    ///
    /// Fails when there is no primary key, no address, the primary key does
    /// not unlock with `mailbox_passphrase`, or no address key at all could be
    /// unlocked. Individual keys that fail are skipped and kept in
    /// [`KeyRing::skipped`].
    pub fn build(
        &self,
        addresses: &[Address],
        mailbox_passphrase: &[u8],
        primary_key: Option<&str>,
    ) -> Result<KeyRing<E>, KeyDerivationError> {
        let primary_key = primary_key.ok_or(KeyDerivationError::NoPrimaryKey)?;
        if addresses.is_empty() {
            return Err(KeyDerivationError::NoAddress);
        }

        let primary = self
            .engine
            .unlock(primary_key, mailbox_passphrase)
            .map_err(KeyDerivationError::PrimaryKeyLocked)?;

        let mut entries = Vec::new();
        let mut skipped = Vec::new();
        for address in addresses {
            for address_key in &address.keys {
                match self.unlock_address_key(&primary, address_key, mailbox_passphrase) {
                    Ok(key) => {
                        let public = self.engine.public_of(&key);
                        entries.push(KeyRingEntry {
                            address_id: address.id.clone(),
                            email: address.email.clone(),
                            key_id: address_key.id.clone(),
                            key,
                            public,
                        });
                    }
                    Err(source) => {
                        tracing::warn!(
                            address = %address.email,
                            key_id = %address_key.id,
                            "skipping address key: {}",
                            source
                        );
                        skipped.push(KeyDerivationError::AddressKey {
                            email: address.email.clone(),
                            key_id: address_key.id.clone(),
                            source,
                        });
                    }
                }
            }
        }

        if entries.is_empty() {
            return Err(KeyDerivationError::NoUsableKeys);
        }

        tracing::debug!(
            keys = entries.len(),
            skipped = skipped.len(),
            "built session key ring"
        );
        Ok(KeyRing {
            engine: self.engine.clone(),
            entries,
            skipped,
        })
    }

    fn unlock_address_key(
        &self,
        primary: &E::PrivateKey,
        address_key: &AddressKey,
        mailbox_passphrase: &[u8],
    ) -> Result<E::PrivateKey, CryptoError> {
        match &address_key.token {
            Some(token) => {
                let passphrase = self.engine.decrypt(primary, token)?;
                self.engine.unlock(&address_key.private_key, &passphrase)
            }
            None => self
                .engine
                .unlock(&address_key.private_key, mailbox_passphrase),
        }
    }
}

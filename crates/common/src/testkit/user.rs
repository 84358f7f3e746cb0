use std::sync::Arc;

use time::OffsetDateTime;

use crate::config::PipelineConfig;
use crate::crypto::{CryptoEngine, CryptoError, NativeEngine, PublicKey, SecretKey};
use crate::keyring::{Address, AddressKey, KeyDerivationError, KeyRing, KeyRingBuilder, UserKeys};
use crate::pipeline::SharePipeline;

pub const MAILBOX_PASSPHRASE: &[u8] = b"correct horse battery staple";

/// A user with one address and one token-protected address key
pub struct TestUser {
    pub engine: NativeEngine,
    pub email: String,
    pub user_keys: UserKeys,
    address_key: SecretKey,
}

impl TestUser {
    pub fn new(email: &str) -> Result<Self, CryptoError> {
        let engine = super::engine();

        let primary = SecretKey::generate()?;
        let primary_armored = primary.lock(MAILBOX_PASSPHRASE, engine.kdf())?;

        let address_key = SecretKey::generate()?;
        let key_passphrase = format!("{} address key", email);
        let token = engine.encrypt(&primary.public(), key_passphrase.as_bytes())?;

        let user_keys = UserKeys {
            user_keys: vec![primary_armored],
            addresses: vec![Address {
                id: format!("address-{}", email),
                email: email.to_string(),
                keys: vec![AddressKey {
                    id: format!("key-{}", email),
                    private_key: address_key.lock(key_passphrase.as_bytes(), engine.kdf())?,
                    token: Some(token),
                }],
            }],
        };

        Ok(Self {
            engine,
            email: email.to_string(),
            user_keys,
            address_key,
        })
    }

    pub fn public_key(&self) -> PublicKey {
        self.address_key.public()
    }

    /// Armored detached signature by the address key
    pub fn sign(&self, data: &[u8], at: OffsetDateTime) -> Result<String, CryptoError> {
        self.engine.sign(&self.address_key, data, at)
    }

    pub fn key_ring(&self) -> Result<KeyRing<NativeEngine>, KeyDerivationError> {
        KeyRingBuilder::new(self.engine).build_for(&self.user_keys, MAILBOX_PASSPHRASE)
    }

    /// A pipeline over this user's key ring with default settings
    pub fn pipeline(&self) -> Result<SharePipeline<NativeEngine>, KeyDerivationError> {
        Ok(SharePipeline::new(
            Arc::new(self.key_ring()?),
            PipelineConfig::default(),
        ))
    }
}

//! The share pipeline
//!
//! Opens a share into a [`Vault`]:
//! 1. reject shares that are not vault shares
//! 2. validate the trust chain ([`TrustChainValidator`])
//! 3. recover the vault key passphrase and decrypt the content
//!    ([`ContentDecryptor`])
//! 4. parse the plaintext ([`VaultAssembler`])
//!
//! The first failing step ends the run for that share. A pipeline holds no
//! mutable state; the session [`KeyRing`] is shared read-only, so one pipeline
//! can serve any number of concurrent invocations (see [`open_all`]).

mod batch;
mod error;

use std::sync::Arc;

use time::OffsetDateTime;

use crate::config::PipelineConfig;
use crate::crypto::CryptoEngine;
use crate::keyring::{KeyRing, KeyRingBuilder, PublicKeyDirectory, UserKeys};
use crate::share::{
    ContentDecryptor, ContentRotation, Share, ShareBundle, TargetType, TrustChainValidator,
    VaultKey, VaultKeySelector,
};
use crate::vault::{JsonCodec, Vault, VaultAssembler, VaultContentCodec};

pub use batch::{open_all, open_all_at};
pub use error::PipelineError;

/// Content signers looked up in the session ring first, then in an optional
/// external directory
struct Signers<'a, E: CryptoEngine> {
    ring: &'a KeyRing<E>,
    external: Option<&'a dyn PublicKeyDirectory<E::PublicKey>>,
}

impl<E: CryptoEngine> PublicKeyDirectory<E::PublicKey> for Signers<'_, E> {
    fn public_keys_for(&self, email: &str) -> Vec<E::PublicKey> {
        let mut keys = self.ring.public_keys_for(email);
        if let Some(external) = self.external {
            keys.extend(external.public_keys_for(email));
        }
        keys
    }
}

pub struct SharePipeline<E: CryptoEngine, C = JsonCodec> {
    ring: Arc<KeyRing<E>>,
    directory: Option<Arc<dyn PublicKeyDirectory<E::PublicKey>>>,
    selector: Arc<dyn VaultKeySelector>,
    validator: TrustChainValidator<E>,
    decryptor: ContentDecryptor<E>,
    assembler: VaultAssembler<C>,
    config: PipelineConfig,
}

impl<E: CryptoEngine> SharePipeline<E, JsonCodec> {
    pub fn new(ring: Arc<KeyRing<E>>, config: PipelineConfig) -> Self {
        let engine = ring.engine().clone();
        Self {
            validator: TrustChainValidator::new(engine.clone())
                .with_clock_skew(config.clock_skew_secs)
                .with_expiry(config.enforce_expiry),
            decryptor: ContentDecryptor::new(engine).with_clock_skew(config.clock_skew_secs),
            ring,
            directory: None,
            selector: Arc::new(ContentRotation::default()),
            assembler: VaultAssembler::default(),
            config,
        }
    }

    /// Build the session key ring and a pipeline on top of it
    pub fn from_session(
        engine: E,
        user: &UserKeys,
        mailbox_passphrase: &[u8],
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let ring = KeyRingBuilder::new(engine).build_for(user, mailbox_passphrase)?;
        Ok(Self::new(Arc::new(ring), config))
    }
}

impl<E: CryptoEngine, C: VaultContentCodec> SharePipeline<E, C> {
    pub fn with_selector(mut self, selector: impl VaultKeySelector + 'static) -> Self {
        self.selector = Arc::new(selector);
        self
    }

    /// Directory for content signers outside the user's own addresses
    pub fn with_directory(
        mut self,
        directory: Arc<dyn PublicKeyDirectory<E::PublicKey>>,
    ) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_assembler<C2: VaultContentCodec>(
        self,
        assembler: VaultAssembler<C2>,
    ) -> SharePipeline<E, C2> {
        SharePipeline {
            ring: self.ring,
            directory: self.directory,
            selector: self.selector,
            validator: self.validator,
            decryptor: self.decryptor,
            assembler,
            config: self.config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn key_ring(&self) -> &Arc<KeyRing<E>> {
        &self.ring
    }

    /// Open a share bundle at the current time
    pub fn open(&self, bundle: &ShareBundle) -> Result<Vault, PipelineError> {
        self.open_at(bundle, OffsetDateTime::now_utc())
    }

    pub fn open_at(
        &self,
        bundle: &ShareBundle,
        verify_time: OffsetDateTime,
    ) -> Result<Vault, PipelineError> {
        self.open_share(&bundle.share, &bundle.vault_keys, verify_time)
    }

    /// Open a share with explicit vault keys, checking signatures at `verify_time`
    pub fn open_share(
        &self,
        share: &Share,
        vault_keys: &[VaultKey],
        verify_time: OffsetDateTime,
    ) -> Result<Vault, PipelineError> {
        let span = tracing::debug_span!("open_share", share_id = %share.share_id);
        let _guard = span.enter();

        let result = self.run(share, vault_keys, verify_time);
        match &result {
            Ok(_) => tracing::debug!("share opened"),
            Err(e) => tracing::warn!("failed to open share: {}", e),
        }
        result
    }

    fn run(
        &self,
        share: &Share,
        vault_keys: &[VaultKey],
        verify_time: OffsetDateTime,
    ) -> Result<Vault, PipelineError> {
        if share.target_type != TargetType::Vault {
            return Err(PipelineError::UnsupportedTarget(share.target_type));
        }

        let trust = self.validator.validate(
            share,
            vault_keys,
            self.selector.as_ref(),
            &self.ring,
            verify_time,
        )?;

        let passphrase = self.decryptor.vault_passphrase(&trust.vault_key, &self.ring)?;
        let signers = Signers {
            ring: &self.ring,
            external: self.directory.as_deref(),
        };
        let plain_content = self.decryptor.decrypt(
            share,
            &trust.vault_key,
            &passphrase,
            &signers,
            verify_time,
        )?;
        drop(passphrase);

        Ok(self.assembler.assemble_share(share, &plain_content)?)
    }
}

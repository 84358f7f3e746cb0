use time::{Duration, OffsetDateTime};

use super::TestUser;
use crate::crypto::{ArmorKind, CryptoEngine, CryptoError, NativeEngine, SecretKey};
use crate::share::{wire_encode, Share, ShareBundle, TargetType, VaultKey};
use crate::vault::{JsonCodec, VaultContent, VaultContentCodec, CONTENT_FORMAT_VERSION};

/// A vault key together with its unlocked form and passphrase
pub struct TestVaultKey {
    pub key: SecretKey,
    pub passphrase: Vec<u8>,
    pub record: VaultKey,
}

/// A share built by [`ShareBuilder`], with the secrets behind it
pub struct TestShare {
    pub bundle: ShareBundle,
    pub signing_key: SecretKey,
    pub signing_key_passphrase: Vec<u8>,
    pub vault_keys: Vec<TestVaultKey>,
    pub plain_content: Vec<u8>,
    pub signed_at: OffsetDateTime,
}

impl TestShare {
    /// Vault key of the share's content rotation
    pub fn content_key(&self) -> Option<&TestVaultKey> {
        self.vault_keys
            .iter()
            .find(|k| k.record.rotation_id == self.bundle.share.content_rotation_id)
    }

    /// Replace the share content with `plain`, signed by `signer`
    pub fn reseal(&mut self, signer: &TestUser, plain: &[u8]) -> Result<(), CryptoError> {
        let engine = signer.engine;
        let content_key = self
            .content_key()
            .ok_or_else(|| anyhow::anyhow!("share has no content key"))?;
        let sealed = seal_content(&engine, content_key, signer, plain, self.signed_at)?;

        let share = &mut self.bundle.share;
        share.content = Some(sealed.content);
        share.content_encrypted_address_signature = sealed.address_signature;
        share.content_encrypted_vault_signature = sealed.vault_signature;
        share.content_signature_email = signer.email.clone();
        self.plain_content = plain.to_vec();
        Ok(())
    }
}

struct SealedContent {
    content: String,
    address_signature: String,
    vault_signature: String,
}

fn encrypt_for_wire(
    engine: &NativeEngine,
    recipient: &crate::crypto::PublicKey,
    data: &[u8],
) -> Result<String, CryptoError> {
    let message = engine.encrypt(recipient, data)?;
    wire_encode(engine, &message, ArmorKind::Message)
}

fn seal_content(
    engine: &NativeEngine,
    vault_key: &TestVaultKey,
    signer: &TestUser,
    plain: &[u8],
    at: OffsetDateTime,
) -> Result<SealedContent, CryptoError> {
    let vault_public = vault_key.key.public();

    let address_signature = signer.sign(plain, at)?;
    let vault_signature = engine.sign(&vault_key.key, plain, at)?;

    Ok(SealedContent {
        content: encrypt_for_wire(engine, &vault_public, plain)?,
        address_signature: encrypt_for_wire(
            engine,
            &vault_public,
            address_signature.as_bytes(),
        )?,
        vault_signature: encrypt_for_wire(engine, &vault_public, vault_signature.as_bytes())?,
    })
}

/// Builds a vault share for a recipient
///
/// By default the share is a non-admin vault share with a single vault key
/// whose content is signed by the recipient's own address key.
pub struct ShareBuilder<'a> {
    recipient: &'a TestUser,
    signer: &'a TestUser,
    share_id: String,
    vault_id: String,
    content: VaultContent,
    raw_content: Option<Vec<u8>>,
    rotations: u32,
    admin: bool,
    signed_at: OffsetDateTime,
    expire_time: Option<i64>,
}

impl<'a> ShareBuilder<'a> {
    pub fn new(recipient: &'a TestUser) -> Self {
        Self {
            recipient,
            signer: recipient,
            share_id: "share-1".into(),
            vault_id: "vault-1".into(),
            content: VaultContent {
                name: "Personal".into(),
                description: "Personal vault".into(),
                display: None,
            },
            raw_content: None,
            rotations: 1,
            admin: false,
            signed_at: OffsetDateTime::now_utc() - Duration::minutes(5),
            expire_time: None,
        }
    }

    pub fn ids(mut self, share_id: &str, vault_id: &str) -> Self {
        self.share_id = share_id.to_string();
        self.vault_id = vault_id.to_string();
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.content.name = name.to_string();
        self
    }

    pub fn content(mut self, content: VaultContent) -> Self {
        self.content = content;
        self
    }

    /// Encrypt these bytes instead of the encoded vault content
    pub fn raw_content(mut self, plain: &[u8]) -> Self {
        self.raw_content = Some(plain.to_vec());
        self
    }

    /// The user whose address key signs the content
    pub fn signed_by(mut self, signer: &'a TestUser) -> Self {
        self.signer = signer;
        self
    }

    /// Number of vault key rotations; the content uses the latest
    pub fn rotations(mut self, rotations: u32) -> Self {
        self.rotations = rotations.max(1);
        self
    }

    pub fn admin(mut self) -> Self {
        self.admin = true;
        self
    }

    pub fn signed_at(mut self, at: OffsetDateTime) -> Self {
        self.signed_at = at;
        self
    }

    pub fn expires_at(mut self, unix_secs: i64) -> Self {
        self.expire_time = Some(unix_secs);
        self
    }

    pub fn build(self) -> Result<TestShare, CryptoError> {
        let engine = self.recipient.engine;
        let recipient_public = self.recipient.public_key();

        let signing_key = SecretKey::generate()?;
        let signing_key_passphrase = format!("{} signing key", self.share_id).into_bytes();
        let signing_armored = if self.admin {
            signing_key.lock(&signing_key_passphrase, engine.kdf())?
        } else {
            signing_key.public().to_armored()
        };
        let signing_fingerprint = engine.fingerprint(&signing_armored)?;

        let acceptance = self
            .recipient
            .sign(&signing_fingerprint.signed_payload(), self.signed_at)?;
        let inviter_acceptance = self
            .signer
            .sign(&signing_fingerprint.signed_payload(), self.signed_at)?;

        let mut vault_keys = Vec::new();
        for rotation in 1..=self.rotations {
            let key = SecretKey::generate()?;
            let passphrase = format!("{} vault key {}", self.share_id, rotation).into_bytes();
            let armored = key.lock(&passphrase, engine.kdf())?;
            let fingerprint = engine.fingerprint(&armored)?;
            let key_signature =
                engine.sign(&signing_key, &fingerprint.signed_payload(), self.signed_at)?;

            let record = VaultKey {
                rotation_id: format!("{}-rotation-{}", self.share_id, rotation),
                rotation,
                key: armored,
                key_signature: wire_encode(&engine, &key_signature, ArmorKind::Signature)?,
                key_passphrase: Some(encrypt_for_wire(&engine, &recipient_public, &passphrase)?),
                create_time: self.signed_at.unix_timestamp(),
            };
            vault_keys.push(TestVaultKey {
                key,
                passphrase,
                record,
            });
        }

        let plain_content = match self.raw_content {
            Some(raw) => raw,
            None => JsonCodec
                .encode(&self.content)
                .map_err(|e| anyhow::anyhow!("failed to encode vault content: {}", e))?,
        };
        let content_key = vault_keys
            .last()
            .ok_or_else(|| anyhow::anyhow!("share has no vault key"))?;
        let sealed = seal_content(
            &engine,
            content_key,
            self.signer,
            &plain_content,
            self.signed_at,
        )?;

        let share = Share {
            share_id: self.share_id,
            vault_id: self.vault_id.clone(),
            target_type: TargetType::Vault,
            target_id: self.vault_id,
            permission: 0,
            acceptance_signature: wire_encode(&engine, &acceptance, ArmorKind::Signature)?,
            inviter_email: self.signer.email.clone(),
            inviter_acceptance_signature: wire_encode(
                &engine,
                &inviter_acceptance,
                ArmorKind::Signature,
            )?,
            signing_key: signing_armored,
            signing_key_passphrase: if self.admin {
                Some(encrypt_for_wire(&engine, &recipient_public, &signing_key_passphrase)?)
            } else {
                None
            },
            content: Some(sealed.content),
            content_rotation_id: content_key.record.rotation_id.clone(),
            content_encrypted_address_signature: sealed.address_signature,
            content_encrypted_vault_signature: sealed.vault_signature,
            content_signature_email: self.signer.email.clone(),
            content_format_version: CONTENT_FORMAT_VERSION,
            expire_time: self.expire_time,
            create_time: self.signed_at.unix_timestamp(),
        };

        Ok(TestShare {
            bundle: ShareBundle {
                share,
                vault_keys: vault_keys.iter().map(|k| k.record.clone()).collect(),
            },
            signing_key,
            signing_key_passphrase,
            vault_keys,
            plain_content,
            signed_at: self.signed_at,
        })
    }
}

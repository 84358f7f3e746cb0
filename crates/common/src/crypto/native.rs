use time::OffsetDateTime;
use zeroize::Zeroizing;

use super::engine::{CryptoEngine, CryptoError};
use super::fingerprint::Fingerprint;
use super::keys::{KdfParams, PublicKey, SecretKey};
use super::message::SealedMessage;
use super::signature;

/// Default crypto backend: Ed25519 keys, X25519 ECDH messages,
/// ChaCha20-Poly1305 sealing and Argon2id-locked private keys
///
/// The engine is stateless apart from the KDF parameters it uses when it
/// locks keys; unlocking always uses the parameters stored in the key.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine {
    kdf: KdfParams,
}

impl NativeEngine {
    pub fn new(kdf: KdfParams) -> Self {
        Self { kdf }
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    /// Generate a fresh key and return it armored and locked under `passphrase`
    ///
    /// Only fixtures and tooling create keys; the pipeline never does.
    pub fn generate_key(&self, passphrase: &[u8]) -> Result<String, CryptoError> {
        SecretKey::generate()?.lock(passphrase, self.kdf)
    }

    /// Armored public form of an armored key
    pub fn armored_public(&self, armored_key: &str) -> Result<String, CryptoError> {
        Ok(PublicKey::from_armored(armored_key)?.to_armored())
    }
}

impl CryptoEngine for NativeEngine {
    type PrivateKey = SecretKey;
    type PublicKey = PublicKey;

    fn fingerprint(&self, armored_key: &str) -> Result<Fingerprint, CryptoError> {
        Ok(PublicKey::from_armored(armored_key)?.fingerprint())
    }

    fn public_key(&self, armored_key: &str) -> Result<PublicKey, CryptoError> {
        PublicKey::from_armored(armored_key)
    }

    fn unlock(&self, armored_key: &str, passphrase: &[u8]) -> Result<SecretKey, CryptoError> {
        SecretKey::unlock(armored_key, passphrase)
    }

    fn public_of(&self, key: &SecretKey) -> PublicKey {
        key.public()
    }

    fn sign(
        &self,
        key: &SecretKey,
        data: &[u8],
        at: OffsetDateTime,
    ) -> Result<String, CryptoError> {
        signature::sign_detached(key, data, at)
    }

    fn verify_detached(
        &self,
        keys: &[PublicKey],
        data: &[u8],
        armored_signature: &str,
        verify_time: OffsetDateTime,
    ) -> Result<(), CryptoError> {
        signature::verify_detached(keys, data, armored_signature, verify_time)
    }

    fn encrypt(&self, recipient: &PublicKey, data: &[u8]) -> Result<String, CryptoError> {
        SealedMessage::seal(data, recipient)?.to_armored()
    }

    fn decrypt(
        &self,
        key: &SecretKey,
        armored_message: &str,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        SealedMessage::from_armored(armored_message)?.open(key)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fingerprint_matches_between_private_and_public_forms() {
        let engine = NativeEngine::new(KdfParams::fast());
        let armored = engine.generate_key(b"pw").unwrap();
        let public = engine.armored_public(&armored).unwrap();
        assert_eq!(
            engine.fingerprint(&armored).unwrap(),
            engine.fingerprint(&public).unwrap()
        );
    }

    #[test]
    fn test_encrypt_decrypt_through_engine() {
        let engine = NativeEngine::new(KdfParams::fast());
        let armored = engine.generate_key(b"pw").unwrap();
        let key = engine.unlock(&armored, b"pw").unwrap();
        let public = engine.public_key(&armored).unwrap();

        let message = engine.encrypt(&public, b"payload").unwrap();
        assert_eq!(engine.decrypt(&key, &message).unwrap().as_slice(), b"payload");
    }

    #[test]
    fn test_sign_verify_through_engine() {
        let engine = NativeEngine::new(KdfParams::fast());
        let armored = engine.generate_key(b"pw").unwrap();
        let key = engine.unlock(&armored, b"pw").unwrap();
        let now = OffsetDateTime::now_utc();

        let sig = engine.sign(&key, b"data", now).unwrap();
        engine
            .verify_detached(&[engine.public_of(&key)], b"data", &sig, now)
            .unwrap();
    }

    #[test]
    fn test_unlock_wrong_passphrase() {
        let engine = NativeEngine::new(KdfParams::fast());
        let armored = engine.generate_key(b"pw").unwrap();
        assert!(matches!(
            engine.unlock(&armored, b"nope"),
            Err(CryptoError::Unlock)
        ));
    }
}

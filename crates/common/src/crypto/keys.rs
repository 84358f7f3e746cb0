use argon2::{Algorithm, Argon2, Params, Version};
use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::armor::{armor, dearmor, dearmor_any, ArmorKind};
use super::engine::CryptoError;
use super::fingerprint::Fingerprint;
use super::secret::{Secret, SECRET_SIZE};

/// Size of Ed25519 private key in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of Ed25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Size of the Argon2 salt stored in a locked key
pub const SALT_SIZE: usize = 16;

/// Argon2id parameters used to derive a key-locking secret from a passphrase
///
/// The parameters travel inside every locked key, so keys locked with
/// different settings can coexist in one key ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Minimal parameters for fixtures and tests
    pub fn fast() -> Self {
        Self {
            memory_kib: 256,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn derive(&self, passphrase: &[u8], salt: &[u8]) -> Result<Secret, CryptoError> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(SECRET_SIZE),
        )
        .map_err(|e| anyhow::anyhow!("invalid argon2 params: {}", e))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut out = Zeroizing::new([0u8; SECRET_SIZE]);
        argon2
            .hash_password_into(passphrase, salt, &mut out[..])
            .map_err(|e| anyhow::anyhow!("key derivation failed: {}", e))?;
        Ok(Secret::from(*out))
    }
}

/// Body of an `ENCRYPTED PRIVATE KEY` block
///
/// The public half is kept in the clear so a locked key can still be
/// fingerprinted and used for verification without its passphrase.
#[derive(Serialize, Deserialize)]
struct LockedKeyBody {
    public: [u8; PUBLIC_KEY_SIZE],
    kdf: KdfParams,
    salt: [u8; SALT_SIZE],
    sealed_seed: Vec<u8>,
}

impl LockedKeyBody {
    fn from_armored(armored: &str) -> Result<Self, CryptoError> {
        let raw = dearmor(armored, ArmorKind::PrivateKey)?;
        bincode::deserialize(&raw)
            .map_err(|e| CryptoError::InvalidKey(format!("malformed private key: {}", e)))
    }
}

/// Ed25519 public key used for verification and as an encryption recipient
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(VerifyingKey);

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = CryptoError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "invalid public key size, expected {}, got {}",
                PUBLIC_KEY_SIZE,
                bytes.len()
            )));
        }
        let mut buff = [0; PUBLIC_KEY_SIZE];
        buff.copy_from_slice(bytes);
        let key = VerifyingKey::from_bytes(&buff)
            .map_err(|e| CryptoError::InvalidKey(format!("invalid public key: {}", e)))?;
        Ok(PublicKey(key))
    }
}

impl PublicKey {
    /// Convert public key to raw bytes
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Fingerprint over the full public key material
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::digest(&self.to_bytes())
    }

    /// Armor as a `PUBLIC KEY` block
    pub fn to_armored(&self) -> String {
        armor(&self.to_bytes(), ArmorKind::PublicKey)
    }

    /// Read the public key out of an armored key of either form
    ///
    /// A locked private key yields its clear public half; no passphrase is needed.
    pub fn from_armored(armored: &str) -> Result<Self, CryptoError> {
        let (kind, raw) = dearmor_any(armored)?;
        match kind {
            ArmorKind::PublicKey => PublicKey::try_from(raw.as_slice()),
            ArmorKind::PrivateKey => {
                let body: LockedKeyBody = bincode::deserialize(&raw).map_err(|e| {
                    CryptoError::InvalidKey(format!("malformed private key: {}", e))
                })?;
                PublicKey::try_from(body.public.as_slice())
            }
            other => Err(CryptoError::Armor(format!(
                "expected a key block, found {}",
                other
            ))),
        }
    }

    /// Convert Ed25519 public key to X25519 (Montgomery curve) for ECDH
    #[allow(clippy::wrong_self_convention)]
    pub(crate) fn to_x25519(&self) -> Result<X25519PublicKey, CryptoError> {
        let edwards_bytes = self.to_bytes();
        let edwards_point = CompressedEdwardsY::from_slice(&edwards_bytes)
            .map_err(|_| anyhow::anyhow!("public key invalid edwards point"))?
            .decompress()
            .ok_or_else(|| anyhow::anyhow!("public key failed to decompress edwards point"))?;

        let montgomery_point = edwards_point.to_montgomery();
        Ok(X25519PublicKey::from(montgomery_point.to_bytes()))
    }

    /// Verify an Ed25519 signature on a message
    pub fn verify(
        &self,
        msg: &[u8],
        signature: &ed25519_dalek::Signature,
    ) -> Result<(), ed25519_dalek::SignatureError> {
        self.0.verify_strict(msg, signature)
    }
}

/// Unlocked Ed25519 private key
///
/// Only ever obtained by unlocking an armored key (or generating one for
/// fixtures). The signing key zeroizes itself on drop.
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretKey").field(&self.public()).finish()
    }
}

impl From<[u8; PRIVATE_KEY_SIZE]> for SecretKey {
    fn from(seed: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(SigningKey::from_bytes(&seed))
    }
}

impl SecretKey {
    /// Generate a new random secret key using a cryptographically secure RNG
    pub fn generate() -> Result<Self, CryptoError> {
        let mut seed = Zeroizing::new([0u8; PRIVATE_KEY_SIZE]);
        getrandom::getrandom(&mut seed[..])
            .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
        Ok(Self::from(*seed))
    }

    /// Derive the public key from this secret key
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// Sign a message, returning a detached Ed25519 signature
    pub fn sign(&self, msg: &[u8]) -> ed25519_dalek::Signature {
        self.0.sign(msg)
    }

    /// Convert Ed25519 secret key to X25519 (Montgomery curve) for ECDH
    pub(crate) fn to_x25519(&self) -> StaticSecret {
        StaticSecret::from(self.0.to_scalar_bytes())
    }

    /// Lock the key under a passphrase and armor it
    pub fn lock(&self, passphrase: &[u8], kdf: KdfParams) -> Result<String, CryptoError> {
        let mut salt = [0u8; SALT_SIZE];
        getrandom::getrandom(&mut salt)
            .map_err(|e| anyhow::anyhow!("failed to generate salt: {}", e))?;

        let sealing = kdf.derive(passphrase, &salt)?;
        let seed = Zeroizing::new(self.0.to_bytes());
        let sealed_seed = sealing
            .encrypt(&seed[..])
            .map_err(|e| anyhow::anyhow!("failed to seal private key: {}", e))?;

        let body = LockedKeyBody {
            public: self.public().to_bytes(),
            kdf,
            salt,
            sealed_seed,
        };
        let raw = bincode::serialize(&body)
            .map_err(|e| anyhow::anyhow!("failed to encode private key: {}", e))?;
        Ok(armor(&raw, ArmorKind::PrivateKey))
    }

    /// Unlock an armored private key
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Unlock`] for a wrong passphrase or a corrupted
    /// seal, and [`CryptoError::InvalidKey`] if the unlocked seed does not
    /// match the public key stored alongside it.
    pub fn unlock(armored: &str, passphrase: &[u8]) -> Result<Self, CryptoError> {
        let body = LockedKeyBody::from_armored(armored)?;
        let sealing = body.kdf.derive(passphrase, &body.salt)?;
        let seed = sealing
            .decrypt(&body.sealed_seed)
            .map_err(|_| CryptoError::Unlock)?;
        if seed.len() != PRIVATE_KEY_SIZE {
            return Err(CryptoError::InvalidKey("unlocked seed has wrong size".into()));
        }

        let mut buff = Zeroizing::new([0u8; PRIVATE_KEY_SIZE]);
        buff.copy_from_slice(&seed);
        let key = Self::from(*buff);
        if key.public().to_bytes() != body.public {
            return Err(CryptoError::InvalidKey(
                "private key does not match its public half".into(),
            ));
        }
        Ok(key)
    }
}

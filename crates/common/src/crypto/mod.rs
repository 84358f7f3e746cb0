//! Cryptographic primitives for share verification
//!
//! This module provides the crypto boundary the share pipeline runs on:
//!
//! - **[`CryptoEngine`]**: the capability set the pipeline needs (fingerprint,
//!   armor/dearmor, sign, verify, encrypt, decrypt, unlock). Everything above
//!   this module is generic over it.
//! - **[`NativeEngine`]**: the default backend built from Ed25519, X25519 and
//!   ChaCha20-Poly1305.
//!
//! # Security Model
//!
//! ## Keys
//! Private keys travel armored and locked: the Ed25519 seed is sealed under a
//! secret derived from the key passphrase with Argon2id. The public half stays
//! readable so that a locked key can be fingerprinted and used to verify.
//!
//! ## Fingerprints
//! A [`Fingerprint`] is SHA-256 over the full public key material. The
//! private and public armor of one key therefore share a fingerprint, which is
//! what trust-chain signatures are made over.
//!
//! ## Messages
//! Encryption to a public key follows the ECDH pattern:
//! 1. Generate an ephemeral Ed25519 keypair
//! 2. Convert both keys to X25519 and perform ECDH
//! 3. Derive a [`Secret`] from the shared secret with BLAKE3
//! 4. Seal the payload with ChaCha20-Poly1305
//!
//! ## Signatures
//! Detached signatures carry their creation time and are checked against an
//! explicit verification time.

mod armor;
mod engine;
mod fingerprint;
mod keys;
mod message;
mod native;
mod secret;
mod signature;

pub use armor::{armor, dearmor, ArmorKind};
pub use engine::{CryptoEngine, CryptoError};
pub use fingerprint::{Fingerprint, FINGERPRINT_SIZE};
pub use keys::{KdfParams, PublicKey, SecretKey};
pub use message::SealedMessage;
pub use native::NativeEngine;
pub use secret::{Secret, SecretError};
pub use signature::{sign_detached, verify_detached};

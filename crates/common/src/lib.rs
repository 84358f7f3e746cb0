/**
 * Configuration of the share pipeline.
 */
pub mod config;
/**
 * Cryptographic types and operations.
 *  - The crypto engine boundary and its native backend
 *  - Fingerprints, armoring, signatures and messages
 */
pub mod crypto;
/**
 * Session key rings: unlocking address keys
 *  and exposing them as a capability.
 */
pub mod keyring;
/**
 * Opening shares into vaults, one at a time
 *  or as a concurrent batch.
 */
pub mod pipeline;
/**
 * Share records, the trust chain that guards them
 *  and decryption of their content.
 */
pub mod share;
/**
 * Fixture builders for tests.
 */
pub mod testkit;
/**
 * Decrypted vaults and their content schema.
 */
pub mod vault;

pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::crypto::{CryptoEngine, CryptoError, Fingerprint, NativeEngine};
    pub use crate::keyring::{KeyRing, KeyRingBuilder, PublicKeyDirectory, UserKeys};
    pub use crate::pipeline::{open_all, PipelineError, SharePipeline};
    pub use crate::share::{Share, ShareBundle, VaultKey};
    pub use crate::vault::Vault;
}

/// Fixture builders for share pipeline tests
///
/// Builds users, share records and vault keys with real signatures and real
/// encryption, using [`KdfParams::fast`](crate::crypto::KdfParams::fast) so
/// that key locking stays cheap.
///
/// # Example
///
/// ```rust,ignore
/// use common::testkit::{ShareBuilder, TestUser};
///
/// let alice = TestUser::new("alice@example.com")?;
/// let share = ShareBuilder::new(&alice).name("Personal").build()?;
///
/// let pipeline = alice.pipeline()?;
/// let vault = pipeline.open(&share.bundle)?;
/// assert_eq!(vault.name(), "Personal");
/// ```
mod share;
mod user;

use crate::crypto::{KdfParams, NativeEngine};

pub use share::{ShareBuilder, TestShare, TestVaultKey};
pub use user::{TestUser, MAILBOX_PASSPHRASE};

/// An engine with cheap key-locking parameters
pub fn engine() -> NativeEngine {
    NativeEngine::new(KdfParams::fast())
}

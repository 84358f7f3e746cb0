use crate::keyring::KeyDerivationError;
use crate::share::{DecryptError, TargetType, TrustError};
use crate::vault::ParseError;

/// Why a share could not be opened
///
/// Every failure is terminal for its share and for that share only.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("key derivation error: {0}")]
    KeyDerivation(#[from] KeyDerivationError),
    #[error("trust error: {0}")]
    Trust(#[from] TrustError),
    #[error("decrypt error: {0}")]
    Decrypt(#[from] DecryptError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("cannot open a {0} share as a vault")]
    UnsupportedTarget(TargetType),
    #[error("share worker failed: {0}")]
    Worker(String),
}

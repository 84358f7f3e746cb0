use std::path::PathBuf;

use clap::Args;
use common::crypto::{CryptoEngine, CryptoError, NativeEngine};

#[derive(Args, Debug, Clone)]
pub struct Fingerprint {
    /// Armored key file, private or public
    pub key: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("failed to read key file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to fingerprint key: {0}")]
    Crypto(#[from] CryptoError),
}

#[async_trait::async_trait]
impl crate::op::Op for Fingerprint {
    type Error = FingerprintError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let armored = tokio::fs::read_to_string(&self.key).await?;
        let fingerprint = NativeEngine::default().fingerprint(&armored)?;
        Ok(fingerprint.to_hex())
    }
}

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use common::crypto::{CryptoEngine, CryptoError, NativeEngine, PublicKey};
use common::keyring::{KeyDerivationError, KeyRingBuilder, StaticDirectory, UserKeys};
use common::pipeline::{open_all, SharePipeline};
use common::share::{ContentRotation, FirstVaultKey, LatestRotation, ShareBundle};
use common::vault::Vault;

/// Which vault key to open a share's content with
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The first key listed for the share
    First,
    /// The key with the highest rotation
    Latest,
    /// The key of the share's content rotation, else the latest
    ContentRotation,
}

#[derive(Args, Debug, Clone)]
pub struct Open {
    /// Session file with the user's locked keys and addresses (JSON)
    #[arg(long)]
    pub session: PathBuf,

    /// Share bundle files, or directories of `.json` bundle files
    #[arg(required = true)]
    pub shares: Vec<PathBuf>,

    /// Public keys of content signers outside the session, by email (JSON)
    #[arg(long)]
    pub signers: Option<PathBuf>,

    /// Maximum number of shares opened at once (overrides the config)
    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long, value_enum, default_value_t = Selection::ContentRotation)]
    pub selector: Selection,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("mailbox passphrase not set: export {0}")]
    MissingPassphrase(String),
    #[error("failed to build key ring: {0}")]
    KeyRing(#[from] KeyDerivationError),
    #[error("invalid signer key for {email}: {source}")]
    SignerKey {
        email: String,
        #[source]
        source: CryptoError,
    },
    #[error("worker failed: {0}")]
    Worker(String),
    #[error("failed to render report: {0}")]
    Report(#[from] serde_json::Error),
}

/// A bundle file holds one share bundle or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum BundleFile {
    Many(Vec<ShareBundle>),
    One(Box<ShareBundle>),
}

#[derive(Debug, Serialize)]
struct Opened {
    share_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    vault: Option<Vault>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, OpenError> {
    let raw = tokio::fs::read(path).await.map_err(|source| OpenError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| OpenError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Expand directories into their `.json` files, in name order
async fn bundle_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, OpenError> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        let io_err = |source| OpenError::Io {
            path: path.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(path).await.map_err(io_err)?;
        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let entry_path = entry.path();
            if entry_path.extension().is_some_and(|ext| ext == "json") {
                found.push(entry_path);
            }
        }
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

async fn load_bundles(paths: &[PathBuf]) -> Result<Vec<ShareBundle>, OpenError> {
    let mut bundles = Vec::new();
    for file in bundle_files(paths).await? {
        match read_json::<BundleFile>(&file).await? {
            BundleFile::Many(many) => bundles.extend(many),
            BundleFile::One(one) => bundles.push(*one),
        }
    }
    Ok(bundles)
}

async fn load_signers(
    engine: &NativeEngine,
    path: &Path,
) -> Result<StaticDirectory<PublicKey>, OpenError> {
    let by_email: HashMap<String, Vec<String>> = read_json(path).await?;
    let mut directory = StaticDirectory::new();
    for (email, armored_keys) in by_email {
        for armored in armored_keys {
            let key = engine
                .public_key(&armored)
                .map_err(|source| OpenError::SignerKey {
                    email: email.clone(),
                    source,
                })?;
            directory.insert(&email, key);
        }
    }
    Ok(directory)
}

#[async_trait::async_trait]
impl crate::op::Op for Open {
    type Error = OpenError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = &ctx.state.config;
        let passphrase_env = config.passphrase_env.clone();
        let passphrase = Zeroizing::new(
            std::env::var(&passphrase_env)
                .map_err(|_| OpenError::MissingPassphrase(passphrase_env.clone()))?,
        );

        let engine = NativeEngine::default();
        let user: UserKeys = read_json(&self.session).await?;
        let bundles = load_bundles(&self.shares).await?;
        tracing::info!(shares = bundles.len(), "loaded share bundles");

        // Unlocking keys runs the passphrase KDF; keep it off the async workers
        let ring = tokio::task::spawn_blocking(move || {
            KeyRingBuilder::new(engine).build_for(&user, passphrase.as_bytes())
        })
        .await
        .map_err(|e| OpenError::Worker(e.to_string()))??;
        for skipped in ring.skipped() {
            tracing::warn!("{}", skipped);
        }

        let mut pipeline_config = config.pipeline.clone();
        if let Some(concurrency) = self.concurrency {
            pipeline_config.max_concurrency = concurrency;
        }

        let mut pipeline = SharePipeline::new(Arc::new(ring), pipeline_config);
        pipeline = match self.selector {
            Selection::First => pipeline.with_selector(FirstVaultKey),
            Selection::Latest => pipeline.with_selector(LatestRotation),
            Selection::ContentRotation => pipeline.with_selector(ContentRotation::default()),
        };
        if let Some(path) = &self.signers {
            let directory = load_signers(&engine, path).await?;
            pipeline = pipeline.with_directory(Arc::new(directory));
        }

        let share_ids: Vec<String> = bundles.iter().map(|b| b.share.share_id.clone()).collect();
        let results = open_all(Arc::new(pipeline), bundles).await;

        let report: Vec<Opened> = share_ids
            .into_iter()
            .zip(results)
            .map(|(share_id, result)| match result {
                Ok(vault) => Opened {
                    share_id,
                    vault: Some(vault),
                    error: None,
                },
                Err(e) => Opened {
                    share_id,
                    vault: None,
                    error: Some(e.to_string()),
                },
            })
            .collect();

        let opened = report.iter().filter(|r| r.vault.is_some()).count();
        tracing::info!(opened, failed = report.len() - opened, "share batch done");

        Ok(serde_json::to_string_pretty(&report)?)
    }
}

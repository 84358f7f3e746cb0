use std::sync::Arc;

use futures::stream::{self, StreamExt};
use time::OffsetDateTime;

use super::{PipelineError, SharePipeline};
use crate::crypto::CryptoEngine;
use crate::share::ShareBundle;
use crate::vault::{Vault, VaultContentCodec};

/// Open many share bundles concurrently at the current time
///
/// See [`open_all_at`].
pub async fn open_all<E, C>(
    pipeline: Arc<SharePipeline<E, C>>,
    bundles: Vec<ShareBundle>,
) -> Vec<Result<Vault, PipelineError>>
where
    E: CryptoEngine,
    C: VaultContentCodec + 'static,
{
    open_all_at(pipeline, bundles, OffsetDateTime::now_utc()).await
}

/// Open many share bundles concurrently, all checked at `verify_time`
///
/// Each bundle runs on the blocking thread pool, at most
/// `max_concurrency` at once. Results come back in input order, and a failing
/// share never affects the others.
pub async fn open_all_at<E, C>(
    pipeline: Arc<SharePipeline<E, C>>,
    bundles: Vec<ShareBundle>,
    verify_time: OffsetDateTime,
) -> Vec<Result<Vault, PipelineError>>
where
    E: CryptoEngine,
    C: VaultContentCodec + 'static,
{
    let concurrency = pipeline.config().max_concurrency.max(1);
    tracing::debug!(shares = bundles.len(), concurrency, "opening share batch");

    stream::iter(bundles.into_iter().map(|bundle| {
        let pipeline = pipeline.clone();
        async move {
            let share_id = bundle.share.share_id.clone();
            tokio::task::spawn_blocking(move || pipeline.open_at(&bundle, verify_time))
                .await
                .unwrap_or_else(|e| Err(PipelineError::Worker(format!("{}: {}", share_id, e))))
        }
    }))
    .buffered(concurrency)
    .collect()
    .await
}

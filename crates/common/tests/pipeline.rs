//! Integration tests for the end-to-end share pipeline

use std::sync::Arc;

use common::config::PipelineConfig;
use common::keyring::{KeyDerivationError, StaticDirectory};
use common::pipeline::{open_all_at, PipelineError, SharePipeline};
use common::share::{
    DecryptError, FirstVaultKey, LatestRotation, ShareBundle, TargetType, TrustError,
};
use common::testkit::{ShareBuilder, TestUser, MAILBOX_PASSPHRASE};
use time::OffsetDateTime;

#[test]
fn test_open_share() {
    let user = TestUser::new("alice@example.com").unwrap();
    let fixture = ShareBuilder::new(&user).name("Work").build().unwrap();

    let vault = user.pipeline().unwrap().open(&fixture.bundle).unwrap();
    assert_eq!(vault.name(), "Work");
    assert_eq!(vault.description(), "Personal vault");
    assert_eq!(vault.id(), "vault-1");
    assert_eq!(vault.share_id(), "share-1");
    assert!(!vault.is_admin());
}

#[test]
fn test_open_admin_share() {
    let user = TestUser::new("alice@example.com").unwrap();
    let fixture = ShareBuilder::new(&user).admin().build().unwrap();
    let vault = user.pipeline().unwrap().open(&fixture.bundle).unwrap();
    assert!(vault.is_admin());
}

#[test]
fn test_from_session() {
    let user = TestUser::new("alice@example.com").unwrap();
    let fixture = ShareBuilder::new(&user).build().unwrap();

    let pipeline = SharePipeline::from_session(
        user.engine,
        &user.user_keys,
        MAILBOX_PASSPHRASE,
        PipelineConfig::default(),
    )
    .unwrap();
    pipeline.open(&fixture.bundle).unwrap();

    let err = SharePipeline::from_session(
        user.engine,
        &user.user_keys,
        b"not the mailbox passphrase",
        PipelineConfig::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(
        err,
        PipelineError::KeyDerivation(KeyDerivationError::PrimaryKeyLocked(_))
    ));
}

#[test]
fn test_non_vault_share() {
    let user = TestUser::new("alice@example.com").unwrap();
    let mut fixture = ShareBuilder::new(&user).build().unwrap();
    fixture.bundle.share.target_type = TargetType::Item;

    let err = user.pipeline().unwrap().open(&fixture.bundle).unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedTarget(TargetType::Item)));
}

#[test]
fn test_empty_vault_key_list() {
    let user = TestUser::new("alice@example.com").unwrap();
    let mut fixture = ShareBuilder::new(&user).build().unwrap();
    fixture.bundle.vault_keys.clear();

    let err = user.pipeline().unwrap().open(&fixture.bundle).unwrap_err();
    assert!(matches!(err, PipelineError::Trust(TrustError::NoVaultKey)));
}

#[test]
fn test_rotation_selection() {
    let user = TestUser::new("alice@example.com").unwrap();
    let mut fixture = ShareBuilder::new(&user).rotations(3).build().unwrap();
    // Server order is not rotation order
    fixture.bundle.vault_keys.reverse();
    fixture.bundle.vault_keys.swap(0, 1);

    // Content rotation (default) and latest rotation pick the content key
    user.pipeline().unwrap().open(&fixture.bundle).unwrap();
    user.pipeline()
        .unwrap()
        .with_selector(LatestRotation)
        .open(&fixture.bundle)
        .unwrap();

    // The first key in the list is vouched for but cannot open the content
    let err = user
        .pipeline()
        .unwrap()
        .with_selector(FirstVaultKey)
        .open(&fixture.bundle)
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Decrypt(DecryptError::DecryptionFailed(_))
    ));
}

#[test]
fn test_external_signer_directory() {
    let user = TestUser::new("alice@example.com").unwrap();
    let admin = TestUser::new("admin@example.com").unwrap();
    let fixture = ShareBuilder::new(&user).signed_by(&admin).build().unwrap();

    let err = user.pipeline().unwrap().open(&fixture.bundle).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Decrypt(DecryptError::SignatureMismatch(_))
    ));

    let mut directory = StaticDirectory::new();
    directory.insert(&admin.email, admin.public_key());
    let vault = user
        .pipeline()
        .unwrap()
        .with_directory(Arc::new(directory))
        .open(&fixture.bundle)
        .unwrap();
    assert_eq!(vault.name(), "Personal");
}

#[test]
fn test_failure_is_terminal_for_one_share_only() {
    let user = TestUser::new("alice@example.com").unwrap();
    let pipeline = user.pipeline().unwrap();
    let good = ShareBuilder::new(&user).ids("good", "v-good").build().unwrap();
    let mut bad = ShareBuilder::new(&user).ids("bad", "v-bad").build().unwrap();
    bad.bundle.share.acceptance_signature = good.bundle.share.acceptance_signature.clone();

    assert!(matches!(
        pipeline.open(&bad.bundle).unwrap_err(),
        PipelineError::Trust(TrustError::AcceptanceInvalid(_))
    ));
    assert_eq!(pipeline.open(&good.bundle).unwrap().share_id(), "good");
}

fn describe(result: &Result<common::vault::Vault, PipelineError>) -> String {
    match result {
        Ok(vault) => format!("ok:{}:{}", vault.share_id(), vault.name()),
        Err(e) => format!("err:{}", e),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_matches_sequential() {
    let user = TestUser::new("alice@example.com").unwrap();
    let other = TestUser::new("bob@example.com").unwrap();

    let mut bundles: Vec<ShareBundle> = Vec::new();
    for i in 0..100 {
        let mut fixture = ShareBuilder::new(&user)
            .ids(&format!("share-{}", i), &format!("vault-{}", i))
            .name(&format!("Vault {}", i))
            .build()
            .unwrap();
        match i % 10 {
            3 => fixture.bundle.vault_keys.clear(),
            7 => fixture.bundle.share.content_format_version = 9,
            _ => {}
        }
        bundles.push(fixture.bundle);
    }
    // One share accepted by somebody else
    bundles[50] = ShareBuilder::new(&other)
        .ids("share-50", "vault-50")
        .build()
        .unwrap()
        .bundle;

    let pipeline = Arc::new(user.pipeline().unwrap());
    let now = OffsetDateTime::now_utc();

    let sequential: Vec<String> = bundles
        .iter()
        .map(|bundle| describe(&pipeline.open_at(bundle, now)))
        .collect();
    let parallel: Vec<String> = open_all_at(pipeline.clone(), bundles, now)
        .await
        .iter()
        .map(describe)
        .collect();

    assert_eq!(parallel.len(), 100);
    assert_eq!(parallel, sequential);
    assert_eq!(parallel[0], "ok:share-0:Vault 0");
    assert!(parallel[3].starts_with("err:trust error"));
    assert!(parallel[7].starts_with("err:parse error"));
    assert!(parallel[50].starts_with("err:trust error"));
    assert_eq!(
        parallel.iter().filter(|r| r.starts_with("ok:")).count(),
        100 - 10 - 10 - 1
    );
}

#[tokio::test]
async fn test_batch_with_single_worker() {
    let user = TestUser::new("alice@example.com").unwrap();
    let bundles: Vec<ShareBundle> = (0..5)
        .map(|i| {
            ShareBuilder::new(&user)
                .ids(&format!("share-{}", i), &format!("vault-{}", i))
                .build()
                .unwrap()
                .bundle
        })
        .collect();

    let config = PipelineConfig {
        max_concurrency: 0,
        ..PipelineConfig::default()
    };
    let pipeline = Arc::new(SharePipeline::new(Arc::new(user.key_ring().unwrap()), config));
    let results = open_all_at(pipeline, bundles, OffsetDateTime::now_utc()).await;

    let ids: Vec<String> = results
        .into_iter()
        .map(|r| r.unwrap().share_id().to_string())
        .collect();
    assert_eq!(ids, vec!["share-0", "share-1", "share-2", "share-3", "share-4"]);
}

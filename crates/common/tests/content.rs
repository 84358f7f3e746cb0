//! Integration tests for share content decryption and vault assembly

mod common;

use ::common::crypto::{ArmorKind, CryptoEngine, CryptoError, NativeEngine};
use ::common::keyring::{KeyRing, StaticDirectory};
use ::common::share::{wire_encode, DecryptError, FirstVaultKey, VerifiedTrust};
use ::common::testkit::{ShareBuilder, TestShare, TestUser};
use ::common::vault::{DisplayPreferences, JsonCodec, ParseError, VaultAssembler, VaultContent};
use time::OffsetDateTime;

fn verified(
    user: &TestUser,
    ring: &KeyRing<NativeEngine>,
    fixture: &TestShare,
) -> VerifiedTrust<NativeEngine> {
    common::validator(user)
        .validate(
            &fixture.bundle.share,
            &fixture.bundle.vault_keys,
            &FirstVaultKey,
            ring,
            OffsetDateTime::now_utc(),
        )
        .unwrap()
}

/// Encrypt `data` to the share's vault key, in wire form
fn encrypt_to_vault_key(user: &TestUser, fixture: &TestShare, data: &[u8]) -> String {
    let public = fixture.vault_keys[0].key.public();
    let message = user.engine.encrypt(&public, data).unwrap();
    wire_encode(&user.engine, &message, ArmorKind::Message).unwrap()
}

fn decrypt_fixture(
    user: &TestUser,
    ring: &KeyRing<NativeEngine>,
    fixture: &TestShare,
) -> Result<zeroize::Zeroizing<Vec<u8>>, DecryptError> {
    let trust = verified(user, ring, fixture);
    common::decryptor(user).decrypt(
        &fixture.bundle.share,
        &trust.vault_key,
        &fixture.vault_keys[0].passphrase,
        ring,
        OffsetDateTime::now_utc(),
    )
}

#[test]
fn test_decrypt_and_assemble() {
    let user = TestUser::new("alice@example.com").unwrap();
    let ring = user.key_ring().unwrap();
    let content = VaultContent {
        name: "Family".into(),
        description: "Shared with the family".into(),
        display: Some(DisplayPreferences { color: 2, icon: 9 }),
    };
    let fixture = ShareBuilder::new(&user).content(content.clone()).build().unwrap();
    let trust = verified(&user, &ring, &fixture);

    let decryptor = common::decryptor(&user);
    let passphrase = decryptor.vault_passphrase(&trust.vault_key, &ring).unwrap();
    assert_eq!(passphrase.as_slice(), fixture.vault_keys[0].passphrase.as_slice());

    let plain = decryptor
        .decrypt(
            &fixture.bundle.share,
            &trust.vault_key,
            &passphrase,
            &ring,
            OffsetDateTime::now_utc(),
        )
        .unwrap();
    assert_eq!(plain.as_slice(), fixture.plain_content.as_slice());

    let vault = VaultAssembler::<JsonCodec>::default()
        .assemble_share(&fixture.bundle.share, &plain)
        .unwrap();
    assert_eq!(vault.name(), content.name);
    assert_eq!(vault.description(), content.description);
    assert_eq!(vault.display(), DisplayPreferences { color: 2, icon: 9 });
    assert_eq!(vault.id(), fixture.bundle.share.vault_id);
    assert_eq!(vault.share_id(), fixture.bundle.share.share_id);
}

#[test]
fn test_wrong_passphrase() {
    let (user, ring, fixture) = common::setup_test_env();
    let trust = verified(&user, &ring, &fixture);
    let decryptor = common::decryptor(&user);

    let passphrases: [&[u8]; 3] = [b"wrong", b"", b"share-1 vault key 2"];
    for passphrase in passphrases {
        let err = decryptor
            .decrypt(
                &fixture.bundle.share,
                &trust.vault_key,
                passphrase,
                &ring,
                OffsetDateTime::now_utc(),
            )
            .unwrap_err();
        assert!(matches!(err, DecryptError::DecryptionFailed(_)));
    }
}

#[test]
fn test_missing_content() {
    let (user, ring, mut fixture) = common::setup_test_env();
    fixture.bundle.share.content = None;
    let trust = verified(&user, &ring, &fixture);

    let err = common::decryptor(&user)
        .decrypt(
            &fixture.bundle.share,
            &trust.vault_key,
            &fixture.vault_keys[0].passphrase,
            &ring,
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
    assert!(matches!(err, DecryptError::MissingContent));
}

#[test]
fn test_missing_vault_key_passphrase() {
    let (user, ring, mut fixture) = common::setup_test_env();
    fixture.bundle.vault_keys[0].key_passphrase = None;
    let trust = verified(&user, &ring, &fixture);

    let err = common::decryptor(&user)
        .vault_passphrase(&trust.vault_key, &ring)
        .unwrap_err();
    assert!(matches!(err, DecryptError::MissingPassphrase));
}

#[test]
fn test_corrupted_ciphertext() {
    let (user, ring, mut fixture) = common::setup_test_env();
    let content = fixture.bundle.share.content.clone().unwrap();
    let last = common::decoded_len(&content) - 1;
    fixture.bundle.share.content = Some(common::flip_byte(&content, last));
    let trust = verified(&user, &ring, &fixture);

    let err = common::decryptor(&user)
        .decrypt(
            &fixture.bundle.share,
            &trust.vault_key,
            &fixture.vault_keys[0].passphrase,
            &ring,
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
    assert!(matches!(err, DecryptError::DecryptionFailed(_)));
}

#[test]
fn test_content_signed_by_impostor() {
    let (user, ring, mut fixture) = common::setup_test_env();
    let mallory = TestUser::new("mallory@example.com").unwrap();

    // Mallory reseals the content but keeps claiming to be alice
    let plain = fixture.plain_content.clone();
    fixture.reseal(&mallory, &plain).unwrap();
    fixture.bundle.share.content_signature_email = user.email.clone();
    let trust = verified(&user, &ring, &fixture);

    let err = common::decryptor(&user)
        .decrypt(
            &fixture.bundle.share,
            &trust.vault_key,
            &fixture.vault_keys[0].passphrase,
            &ring,
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
    assert!(matches!(err, DecryptError::SignatureMismatch(_)));
}

#[test]
fn test_content_signer_from_directory() {
    let user = TestUser::new("alice@example.com").unwrap();
    let admin = TestUser::new("admin@example.com").unwrap();
    let ring = user.key_ring().unwrap();
    let fixture = ShareBuilder::new(&user).signed_by(&admin).build().unwrap();
    let trust = verified(&user, &ring, &fixture);
    let decryptor = common::decryptor(&user);
    let passphrase = decryptor.vault_passphrase(&trust.vault_key, &ring).unwrap();

    // The session ring does not know the admin's keys
    let err = decryptor
        .decrypt(
            &fixture.bundle.share,
            &trust.vault_key,
            &passphrase,
            &ring,
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
    assert!(matches!(err, DecryptError::SignatureMismatch(_)));

    let mut directory = StaticDirectory::new();
    directory.insert(&admin.email, admin.public_key());
    let plain = decryptor
        .decrypt(
            &fixture.bundle.share,
            &trust.vault_key,
            &passphrase,
            &directory,
            OffsetDateTime::now_utc(),
        )
        .unwrap();
    assert_eq!(plain.as_slice(), fixture.plain_content.as_slice());
}

#[test]
fn test_swapped_vault_signature() {
    let (user, ring, mut fixture) = common::setup_test_env();
    let other = ShareBuilder::new(&user).ids("share-2", "vault-2").build().unwrap();
    fixture.bundle.share.content_encrypted_vault_signature =
        other.bundle.share.content_encrypted_vault_signature.clone();
    let trust = verified(&user, &ring, &fixture);

    // Encrypted to another vault key, so it does not even decrypt
    let err = common::decryptor(&user)
        .decrypt(
            &fixture.bundle.share,
            &trust.vault_key,
            &fixture.vault_keys[0].passphrase,
            &ring,
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
    assert!(matches!(err, DecryptError::DecryptionFailed(_)));
}

#[test]
fn test_malformed_content() {
    let user = TestUser::new("alice@example.com").unwrap();
    let ring = user.key_ring().unwrap();
    let fixture = ShareBuilder::new(&user)
        .raw_content(b"\x00\x01 definitely not a vault")
        .build()
        .unwrap();
    let trust = verified(&user, &ring, &fixture);
    let decryptor = common::decryptor(&user);
    let passphrase = decryptor.vault_passphrase(&trust.vault_key, &ring).unwrap();

    let plain = decryptor
        .decrypt(
            &fixture.bundle.share,
            &trust.vault_key,
            &passphrase,
            &ring,
            OffsetDateTime::now_utc(),
        )
        .unwrap();
    let err = VaultAssembler::<JsonCodec>::default()
        .assemble_share(&fixture.bundle.share, &plain)
        .unwrap_err();
    assert!(matches!(err, ParseError::MalformedContent(_)));
}

#[test]
fn test_unsupported_format_version() {
    let (_, _, mut fixture) = common::setup_test_env();
    fixture.bundle.share.content_format_version = 2;
    let err = VaultAssembler::<JsonCodec>::default()
        .assemble_share(&fixture.bundle.share, &fixture.plain_content)
        .unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedFormat(2)));
}

#[test]
fn test_content_signatures_are_armored_text() {
    let (user, ring, mut fixture) = common::setup_test_env();
    let at = fixture.signed_at;
    let plain = fixture.plain_content.clone();

    let address_signature = user.sign(&plain, at).unwrap();
    let vault_signature = user
        .engine
        .sign(&fixture.vault_keys[0].key, &plain, at)
        .unwrap();
    assert!(address_signature.starts_with("-----BEGIN SIGNATURE-----"));

    fixture.bundle.share.content_encrypted_address_signature =
        encrypt_to_vault_key(&user, &fixture, address_signature.as_bytes());
    fixture.bundle.share.content_encrypted_vault_signature =
        encrypt_to_vault_key(&user, &fixture, vault_signature.as_bytes());

    let decrypted = decrypt_fixture(&user, &ring, &fixture).unwrap();
    assert_eq!(decrypted.as_slice(), plain.as_slice());
}

#[test]
fn test_content_signature_not_text() {
    let (user, ring, mut fixture) = common::setup_test_env();
    fixture.bundle.share.content_encrypted_address_signature =
        encrypt_to_vault_key(&user, &fixture, &[0xff, 0xfe, 0x00, 0x80]);

    let err = decrypt_fixture(&user, &ring, &fixture).unwrap_err();
    assert!(matches!(
        err,
        DecryptError::SignatureMismatch(CryptoError::Armor(_))
    ));
}

#[test]
fn test_vault_signature_by_other_key() {
    let (user, ring, mut fixture) = common::setup_test_env();
    let other = ShareBuilder::new(&user).ids("share-2", "vault-2").build().unwrap();

    // Signed by another vault key but sealed to the right one
    let forged = user
        .engine
        .sign(
            &other.vault_keys[0].key,
            &fixture.plain_content,
            fixture.signed_at,
        )
        .unwrap();
    fixture.bundle.share.content_encrypted_vault_signature =
        encrypt_to_vault_key(&user, &fixture, forged.as_bytes());

    let err = decrypt_fixture(&user, &ring, &fixture).unwrap_err();
    assert!(matches!(
        err,
        DecryptError::SignatureMismatch(CryptoError::BadSignature)
    ));
}

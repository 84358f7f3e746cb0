//! Shared test utilities for share pipeline integration tests
#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use common::crypto::NativeEngine;
use common::keyring::KeyRing;
use common::share::{ContentDecryptor, TrustChainValidator};
use common::testkit::{ShareBuilder, TestShare, TestUser};

/// Route pipeline logs to the test output; filter with `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Set up a user, their key ring and a default share for them
pub fn setup_test_env() -> (TestUser, KeyRing<NativeEngine>, TestShare) {
    init_tracing();
    let user = TestUser::new("alice@example.com").unwrap();
    let ring = user.key_ring().unwrap();
    let share = ShareBuilder::new(&user).build().unwrap();
    (user, ring, share)
}

pub fn validator(user: &TestUser) -> TrustChainValidator<NativeEngine> {
    TrustChainValidator::new(user.engine)
}

pub fn decryptor(user: &TestUser) -> ContentDecryptor<NativeEngine> {
    ContentDecryptor::new(user.engine)
}

/// Flip one bit of byte `index` of a base64 blob
pub fn flip_byte(encoded: &str, index: usize) -> String {
    let mut raw = BASE64.decode(encoded).unwrap();
    raw[index] ^= 0x01;
    BASE64.encode(raw)
}

pub fn decoded_len(encoded: &str) -> usize {
    BASE64.decode(encoded).unwrap().len()
}

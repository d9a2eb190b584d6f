//! Shared test utilities for signer3-multisig tests.
//!
//! Keys are multiples of the secp256k1 generator, so they are valid points
//! with known secret keys and a known canonical order (A < B < C).

use bitcoin::secp256k1::{Secp256k1, SecretKey};
use signer3_core::CompressedPublicKey;

/// Deterministic keypair whose secret scalar is `seed`.
pub fn test_keypair(seed: u8) -> (SecretKey, CompressedPublicKey) {
    let secp = Secp256k1::new();
    let mut secret_bytes = [0u8; 32];
    secret_bytes[31] = seed;
    let sk = SecretKey::from_slice(&secret_bytes).unwrap();
    let pk = CompressedPublicKey::from(sk.public_key(&secp));
    (sk, pk)
}

/// 1·G
pub fn key_a() -> CompressedPublicKey {
    test_keypair(1).1
}

/// 2·G
pub fn key_b() -> CompressedPublicKey {
    test_keypair(2).1
}

/// 3·G
pub fn key_c() -> CompressedPublicKey {
    test_keypair(3).1
}

//! Shared fixtures for unit tests

use once_cell::sync::Lazy;

use crate::infrastructure::api_key::SigningKeypair;

// RSA generation is slow; every test shares these two keys.
static KEYPAIR: Lazy<SigningKeypair> = Lazy::new(|| SigningKeypair::generate(2048).unwrap());
static OTHER_KEYPAIR: Lazy<SigningKeypair> =
    Lazy::new(|| SigningKeypair::generate(2048).unwrap());

/// The keypair most tests sign with
pub fn test_keypair() -> SigningKeypair {
    KEYPAIR.clone()
}

/// An unrelated keypair, for forged-signature cases
pub fn other_keypair() -> SigningKeypair {
    OTHER_KEYPAIR.clone()
}

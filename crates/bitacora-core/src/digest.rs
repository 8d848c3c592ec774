//! SHA-256 digest adapter.

use sha2::{Digest as _, Sha256};

use bitacora_contracts::chain::Digest;

use crate::traits::DigestFunction;

/// `DigestFunction` backed by SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

impl Sha256Digest {
    pub fn new() -> Self {
        Self
    }
}

impl DigestFunction for Sha256Digest {
    fn algorithm(&self) -> &'static str {
        "sha256"
    }

    fn digest(&self, bytes: &[u8]) -> Digest {
        Digest(Sha256::digest(bytes).into())
    }
}

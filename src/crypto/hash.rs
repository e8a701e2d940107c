//! Domain-separated hashing for decryption proofs and sealed inputs
//!
//! Every digest is prefixed with a fixed domain tag so a signature or tag
//! produced for one context can never validate in another. Integers are
//! encoded big-endian.

use sha2::{Digest, Sha256};

pub use crate::domain::Hash256;
use crate::domain::RequestId;

// ============================================================================
// Domain Separation Constants
// ============================================================================

/// Domain prefix for the digest an oracle signs over a decryption result
pub const DOMAIN_DECRYPTION: &[u8] = b"SAFEPLATE_DECRYPTION_V1";

/// Domain prefix for the integrity tag of a sealed client input
pub const DOMAIN_INPUT: &[u8] = b"SAFEPLATE_INPUT_V1";

/// Domain prefix for ciphertext handle derivation
pub const DOMAIN_HANDLE: &[u8] = b"SAFEPLATE_HANDLE_V1";

// ============================================================================
// Binary Encoding Helpers
// ============================================================================

/// Encode a u32 as 4 bytes big-endian
#[inline]
pub fn u32_be(n: u32) -> [u8; 4] {
    n.to_be_bytes()
}

/// Encode a u64 as 8 bytes big-endian
#[inline]
pub fn u64_be(n: u64) -> [u8; 8] {
    n.to_be_bytes()
}

/// Plain SHA-256
pub fn sha256(data: &[u8]) -> Hash256 {
    Sha256::digest(data).into()
}

/// Digest an oracle signs to attest a decryption result.
///
/// ```text
/// SHA256(b"SAFEPLATE_DECRYPTION_V1" || request_id(16) || U32_BE(len) || payload)
/// ```
pub fn decryption_digest(request_id: &RequestId, cleartexts: &[u8]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_DECRYPTION);
    hasher.update(request_id.as_bytes());
    hasher.update(u32_be(cleartexts.len() as u32));
    hasher.update(cleartexts);
    hasher.finalize().into()
}

/// Integrity tag binding a sealed input to the store key that sealed it.
pub fn input_tag(store_key: &[u8; 32], nonce: &[u8; 16], value: u32) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_INPUT);
    hasher.update(store_key);
    hasher.update(nonce);
    hasher.update(u32_be(value));
    hasher.finalize().into()
}

/// Derive a fresh handle from a random seed and the store's allocation counter.
pub fn handle_digest(seed: &[u8; 32], counter: u64) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_HANDLE);
    hasher.update(seed);
    hasher.update(u64_be(counter));
    hasher.finalize().into()
}

/// Constant-time equality for digests and tags.
pub fn digest_eq(a: &Hash256, b: &Hash256) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

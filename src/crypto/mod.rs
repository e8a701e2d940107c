//! Cryptographic utilities for SafePlate Risk Ledger
//!
//! Provides:
//! - Domain-separated hashing for decryption proofs and sealed inputs
//! - The fixed-width cleartext payload codec
//! - Oracle signing (Ed25519) of decryption results

mod codec;
mod hash;
mod signing;


pub use codec::*;
pub use hash::*;
pub use signing::*;

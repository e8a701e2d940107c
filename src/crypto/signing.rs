//! Oracle signing and verification of decryption results
//!
//! An oracle attests each decryption by signing the domain-separated digest
//! of `(request id, raw cleartext payload)` with Ed25519. The ledger only
//! trusts a payload once that signature checks out against the configured
//! oracle public key.

use ed25519_dalek::{
    Signature, Signer, SigningKey, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH,
    SIGNATURE_LENGTH,
};
use rand::rngs::OsRng;

use crate::crypto::hash::{decryption_digest, Hash256};
use crate::domain::RequestId;

/// Ed25519 signature (64 bytes)
pub type Signature64 = [u8; SIGNATURE_LENGTH];

/// Ed25519 public key (32 bytes)
pub type PublicKey32 = [u8; PUBLIC_KEY_LENGTH];

/// Ed25519 secret key (32 bytes)
pub type SecretKey32 = [u8; SECRET_KEY_LENGTH];

/// Error type for signing operations
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("invalid public key format")]
    InvalidPublicKeyFormat,

    #[error("invalid secret key format")]
    InvalidSecretKeyFormat,

    #[error("signature verification failed")]
    VerificationFailed,
}

// ============================================================================
// Oracle Signing Key
// ============================================================================

/// Oracle signing keypair for Ed25519 decryption proofs
#[derive(Clone)]
pub struct OracleSigningKey {
    signing_key: SigningKey,
}

impl OracleSigningKey {
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    pub fn from_bytes(bytes: &SecretKey32) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(bytes),
        }
    }

    pub fn to_bytes(&self) -> SecretKey32 {
        self.signing_key.to_bytes()
    }

    /// Key the ledger checks callback proofs against
    pub fn verifying_key(&self) -> OracleVerifyingKey {
        OracleVerifyingKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    pub fn public_key_bytes(&self) -> PublicKey32 {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign a precomputed digest
    pub fn sign(&self, digest: &Hash256) -> Signature64 {
        self.signing_key.sign(digest).to_bytes()
    }

    /// Sign a decryption result for `request_id`
    pub fn sign_decryption(&self, request_id: &RequestId, cleartexts: &[u8]) -> Signature64 {
        self.sign(&decryption_digest(request_id, cleartexts))
    }
}

impl std::fmt::Debug for OracleSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleSigningKey")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Oracle Verifying Key
// ============================================================================

/// Oracle public key for decryption proof verification
#[derive(Clone)]
pub struct OracleVerifyingKey {
    verifying_key: VerifyingKey,
}

impl OracleVerifyingKey {
    pub fn from_bytes(bytes: &PublicKey32) -> Result<Self, SigningError> {
        let verifying_key =
            VerifyingKey::from_bytes(bytes).map_err(|_| SigningError::InvalidPublicKeyFormat)?;
        Ok(Self { verifying_key })
    }

    /// Parse from hex (with or without 0x prefix)
    pub fn from_hex(hex_str: &str) -> Result<Self, SigningError> {
        Self::from_bytes(&public_key_from_hex(hex_str)?)
    }

    pub fn to_bytes(&self) -> PublicKey32 {
        self.verifying_key.to_bytes()
    }

    /// Verify a signature over a precomputed digest
    pub fn verify(&self, digest: &Hash256, signature: &Signature64) -> Result<(), SigningError> {
        let sig = Signature::from_bytes(signature);
        self.verifying_key
            .verify(digest, &sig)
            .map_err(|_| SigningError::VerificationFailed)
    }

    /// Verify a decryption proof over `(request_id, cleartexts)`
    pub fn verify_decryption(
        &self,
        request_id: &RequestId,
        cleartexts: &[u8],
        signature: &Signature64,
    ) -> Result<(), SigningError> {
        self.verify(&decryption_digest(request_id, cleartexts), signature)
    }
}

impl std::fmt::Debug for OracleVerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleVerifyingKey")
            .field("public_key", &hex::encode(self.to_bytes()))
            .finish()
    }
}

// ============================================================================
// Hex Encoding
// ============================================================================

/// `0x`-prefixed hex of an Ed25519 public key
pub fn public_key_to_hex(public_key: &PublicKey32) -> String {
    format!("0x{}", hex::encode(public_key))
}

pub fn public_key_from_hex(hex_str: &str) -> Result<PublicKey32, SigningError> {
    fixed_from_hex(hex_str).ok_or(SigningError::InvalidPublicKeyFormat)
}

/// Parse a 32-byte secret, as used for oracle and store keys
pub fn secret_key_from_hex(hex_str: &str) -> Result<SecretKey32, SigningError> {
    fixed_from_hex(hex_str).ok_or(SigningError::InvalidSecretKeyFormat)
}

fn fixed_from_hex<const N: usize>(hex_str: &str) -> Option<[u8; N]> {
    let mut out = [0u8; N];
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode_to_slice(hex_str, &mut out).ok()?;
    Some(out)
}

// ============================================================================
// Tests
// ============================================================================

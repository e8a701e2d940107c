//! In-memory ciphertext store
//!
//! A simulated encrypted-value coprocessor for development and tests. Values
//! live behind random 32-byte handles; the ledger can combine handles but
//! never read them. Only the co-located [`super::LocalDecryptionOracle`],
//! which plays the key holder, can decrypt.
//!
//! Sealed input format (53 bytes):
//!
//! ```text
//! 0x01 || U32_BE(value) || nonce(16) || SHA256(DOMAIN_INPUT || key || nonce || U32_BE(value))
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use rand::RngCore;

use crate::crypto::{digest_eq, handle_digest, input_tag, secret_key_from_hex};
use crate::domain::{CiphertextHandle, EncryptedInput};

use super::{CiphertextError, CiphertextStore, LedgerError};

/// Sealed input format version
pub const SEALED_INPUT_VERSION: u8 = 0x01;

/// Length of a sealed input blob
pub const SEALED_INPUT_LEN: usize = 1 + 4 + 16 + 32;

/// Seal a value for submission to a store keyed with `key`.
pub fn seal_value(key: &[u8; 32], value: u32) -> EncryptedInput {
    let mut nonce = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut nonce);

    let mut bytes = Vec::with_capacity(SEALED_INPUT_LEN);
    bytes.push(SEALED_INPUT_VERSION);
    bytes.extend_from_slice(&value.to_be_bytes());
    bytes.extend_from_slice(&nonce);
    bytes.extend_from_slice(&input_tag(key, &nonce, value));
    EncryptedInput::new(bytes)
}

/// Simulated coprocessor holding encrypted `uint32` values.
pub struct InMemoryCiphertextStore {
    key: [u8; 32],
    seed: [u8; 32],
    counter: AtomicU64,
    values: RwLock<HashMap<CiphertextHandle, u32>>,
}

impl InMemoryCiphertextStore {
    /// Create a store with a random key
    pub fn new() -> Self {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self::with_key(key)
    }

    /// Create a store with a fixed sealing key
    pub fn with_key(key: [u8; 32]) -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self {
            key,
            seed,
            counter: AtomicU64::new(0),
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Load the sealing key from `CIPHERTEXT_STORE_KEY` (hex), or generate one
    pub fn from_env() -> Result<Self, LedgerError> {
        match std::env::var("CIPHERTEXT_STORE_KEY") {
            Ok(hex_key) => {
                let key = secret_key_from_hex(&hex_key).map_err(|e| {
                    LedgerError::Configuration(format!("CIPHERTEXT_STORE_KEY: {e}"))
                })?;
                Ok(Self::with_key(key))
            }
            Err(_) => Ok(Self::new()),
        }
    }

    /// Seal a value the way a client holding this store's key would
    pub fn seal(&self, value: u32) -> EncryptedInput {
        seal_value(&self.key, value)
    }

    /// Number of live ciphertexts
    pub fn len(&self) -> usize {
        self.values.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decrypt a handle. Reserved for the key-holding oracle.
    pub(crate) fn decrypt(&self, handle: &CiphertextHandle) -> Result<u32, CiphertextError> {
        let values = self
            .values
            .read()
            .map_err(|_| CiphertextError::Backend("ciphertext store lock poisoned".into()))?;
        values
            .get(handle)
            .copied()
            .ok_or_else(|| CiphertextError::UnknownHandle(handle.to_hex()))
    }

    fn allocate(&self, value: u32) -> Result<CiphertextHandle, CiphertextError> {
        let counter = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = CiphertextHandle::from_bytes(handle_digest(&self.seed, counter));

        let mut values = self
            .values
            .write()
            .map_err(|_| CiphertextError::Backend("ciphertext store lock poisoned".into()))?;
        values.insert(handle, value);
        Ok(handle)
    }

    fn open(&self, input: &EncryptedInput) -> Result<u32, CiphertextError> {
        let bytes = input.as_bytes();
        if bytes.len() != SEALED_INPUT_LEN {
            return Err(CiphertextError::MalformedInput(format!(
                "expected {SEALED_INPUT_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[0] != SEALED_INPUT_VERSION {
            return Err(CiphertextError::MalformedInput(format!(
                "unsupported version {:#04x}",
                bytes[0]
            )));
        }

        let mut value_bytes = [0u8; 4];
        value_bytes.copy_from_slice(&bytes[1..5]);
        let value = u32::from_be_bytes(value_bytes);

        let mut nonce = [0u8; 16];
        nonce.copy_from_slice(&bytes[5..21]);

        let mut tag = [0u8; 32];
        tag.copy_from_slice(&bytes[21..53]);

        if !digest_eq(&tag, &input_tag(&self.key, &nonce, value)) {
            return Err(CiphertextError::MalformedInput(
                "integrity tag mismatch".into(),
            ));
        }
        Ok(value)
    }
}

impl Default for InMemoryCiphertextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CiphertextStore for InMemoryCiphertextStore {
    fn to_opaque_handle(&self, input: &EncryptedInput) -> Result<CiphertextHandle, CiphertextError> {
        let value = self.open(input)?;
        self.allocate(value)
    }

    fn to_bounded_handle(
        &self,
        input: &EncryptedInput,
        max: u32,
    ) -> Result<CiphertextHandle, CiphertextError> {
        let value = self.open(input)?;
        if value > max {
            return Err(CiphertextError::MalformedInput(format!(
                "sealed value exceeds bound {max}"
            )));
        }
        self.allocate(value)
    }

    fn encode_constant(&self, value: u32) -> Result<CiphertextHandle, CiphertextError> {
        self.allocate(value)
    }

    fn add(
        &self,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> Result<CiphertextHandle, CiphertextError> {
        // 32-bit encrypted integers wrap on overflow
        let sum = self.decrypt(lhs)?.wrapping_add(self.decrypt(rhs)?);
        self.allocate(sum)
    }
}

impl std::fmt::Debug for InMemoryCiphertextStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCiphertextStore")
            .field("ciphertexts", &self.len())
            .finish_non_exhaustive()
    }
}

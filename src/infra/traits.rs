//! Trait definitions for the ledger's external collaborators

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::crypto::Signature64;
use crate::domain::{CiphertextHandle, EncryptedInput, Notification, Purpose, RequestId};

use super::{CiphertextError, OracleError};

/// Store of opaque encrypted values.
///
/// Invariant: no plaintext ever leaves this boundary. The ledger only holds
/// handles and combines them through these operations.
#[cfg_attr(test, automock)]
pub trait CiphertextStore: Send + Sync {
    /// Accept a client-encrypted input and return its handle
    ///
    /// Rejects inputs this store did not seal.
    fn to_opaque_handle(&self, input: &EncryptedInput) -> Result<CiphertextHandle, CiphertextError>;

    /// Accept an input whose sealed value must not exceed `max`
    fn to_bounded_handle(
        &self,
        input: &EncryptedInput,
        max: u32,
    ) -> Result<CiphertextHandle, CiphertextError>;

    /// Trivially encrypt a public constant
    fn encode_constant(&self, value: u32) -> Result<CiphertextHandle, CiphertextError>;

    /// Homomorphic addition
    fn add(
        &self,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> Result<CiphertextHandle, CiphertextError>;

    /// Whether a handle is the uninitialized value
    fn is_zero(&self, handle: &CiphertextHandle) -> bool {
        handle.is_zero()
    }
}

/// External decryption oracle.
///
/// Decryption happens off the critical path: `request_decryption` returns
/// immediately with a correlation token, and the cleartext arrives later as a
/// [`crate::domain::DecryptionCallback`] at an unbounded, unordered time.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DecryptionOracle: Send + Sync {
    /// Submit ciphertexts for decryption
    ///
    /// The selector tells the oracle which callback schema the result uses.
    async fn request_decryption(
        &self,
        ciphertexts: Vec<CiphertextHandle>,
        selector: Purpose,
    ) -> Result<RequestId, OracleError>;

    /// Verify that `proof` attests `cleartexts` as the result of `request_id`
    fn check_signatures(
        &self,
        request_id: &RequestId,
        cleartexts: &[u8],
        proof: &Signature64,
    ) -> Result<(), OracleError>;
}

/// Receiver of ledger notifications, called in order of occurrence.
#[cfg_attr(test, automock)]
pub trait NotificationSink: Send + Sync {
    fn publish(&self, notification: Notification);
}

//! Local decryption oracle
//!
//! Development implementation of the oracle contract. It shares the
//! [`InMemoryCiphertextStore`]'s decryption capability, issues UUID v4
//! request ids and signs every result with an Ed25519 key. Fulfillment is a
//! separate step so tests and the relayer control when (and in what order)
//! callbacks arrive.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::crypto::{encode_words, OracleSigningKey, OracleVerifyingKey, Signature64};
use crate::domain::{CiphertextHandle, DecryptionCallback, Purpose, RequestId};

use super::{DecryptionOracle, InMemoryCiphertextStore, OracleError};

/// A decryption request accepted by the oracle but not yet fulfilled.
#[derive(Debug, Clone)]
pub struct IssuedRequest {
    pub request_id: RequestId,
    pub ciphertexts: Vec<CiphertextHandle>,
    pub selector: Purpose,
    pub issued_at: DateTime<Utc>,
}

pub struct LocalDecryptionOracle {
    store: Arc<InMemoryCiphertextStore>,
    signing_key: OracleSigningKey,
    verifying_key: OracleVerifyingKey,
    issued: Mutex<HashMap<RequestId, IssuedRequest>>,
    notifier: Option<mpsc::UnboundedSender<RequestId>>,
    available: AtomicBool,
}

impl LocalDecryptionOracle {
    pub fn new(store: Arc<InMemoryCiphertextStore>, signing_key: OracleSigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            store,
            signing_key,
            verifying_key,
            issued: Mutex::new(HashMap::new()),
            notifier: None,
            available: AtomicBool::new(true),
        }
    }

    /// Forward every issued request id to `notifier` (used by the relayer)
    pub fn with_notifier(mut self, notifier: mpsc::UnboundedSender<RequestId>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn verifying_key(&self) -> &OracleVerifyingKey {
        &self.verifying_key
    }

    /// Simulate an outage: while unavailable, new requests are refused
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Requests issued but not yet fulfilled
    pub fn issued_requests(&self) -> Vec<IssuedRequest> {
        self.issued
            .lock()
            .map(|issued| issued.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Decrypt an issued request and produce its signed callback
    pub fn fulfill(&self, request_id: &RequestId) -> Result<DecryptionCallback, OracleError> {
        let request = self
            .issued
            .lock()
            .map_err(|_| OracleError::Unavailable("oracle lock poisoned".into()))?
            .remove(request_id)
            .ok_or(OracleError::UnknownRequest(*request_id))?;

        let values = request
            .ciphertexts
            .iter()
            .map(|handle| self.store.decrypt(handle))
            .collect::<Result<Vec<u32>, _>>()
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;

        let cleartexts = encode_words(&values);
        let proof = self.signing_key.sign_decryption(request_id, &cleartexts);

        debug!(
            request_id = %request_id,
            selector = %request.selector,
            "Decryption fulfilled"
        );

        Ok(DecryptionCallback {
            request_id: *request_id,
            cleartexts,
            proof,
        })
    }
}

#[async_trait]
impl DecryptionOracle for LocalDecryptionOracle {
    async fn request_decryption(
        &self,
        ciphertexts: Vec<CiphertextHandle>,
        selector: Purpose,
    ) -> Result<RequestId, OracleError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(OracleError::Unavailable("oracle is not accepting requests".into()));
        }

        let request_id = RequestId::new();
        let request = IssuedRequest {
            request_id,
            ciphertexts,
            selector,
            issued_at: Utc::now(),
        };

        self.issued
            .lock()
            .map_err(|_| OracleError::Unavailable("oracle lock poisoned".into()))?
            .insert(request_id, request);

        if let Some(notifier) = &self.notifier {
            if notifier.send(request_id).is_err() {
                warn!(request_id = %request_id, "Relayer channel closed; request will not be relayed");
            }
        }

        Ok(request_id)
    }

    fn check_signatures(
        &self,
        request_id: &RequestId,
        cleartexts: &[u8],
        proof: &Signature64,
    ) -> Result<(), OracleError> {
        self.verifying_key
            .verify_decryption(request_id, cleartexts, proof)
            .map_err(|_| OracleError::InvalidProof)
    }
}

impl std::fmt::Debug for LocalDecryptionOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalDecryptionOracle")
            .field("verifying_key", &self.verifying_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::decode_words;
    use crate::infra::CiphertextStore;

    fn oracle() -> (Arc<InMemoryCiphertextStore>, LocalDecryptionOracle) {
        let store = Arc::new(InMemoryCiphertextStore::new());
        let oracle = LocalDecryptionOracle::new(store.clone(), OracleSigningKey::generate());
        (store, oracle)
    }

    #[tokio::test]
    async fn test_fulfill_decrypts_in_bundle_order() {
        let (store, oracle) = oracle();
        let a = store.encode_constant(160).unwrap();
        let b = store.encode_constant(1).unwrap();

        let request_id = oracle
            .request_decryption(vec![a, b], Purpose::AreaStatsReveal)
            .await
            .unwrap();
        let callback = oracle.fulfill(&request_id).unwrap();

        assert_eq!(callback.request_id, request_id);
        assert_eq!(decode_words(&callback.cleartexts, 2).unwrap(), vec![160, 1]);
        assert!(oracle
            .check_signatures(&request_id, &callback.cleartexts, &callback.proof)
            .is_ok());
    }

    #[tokio::test]
    async fn test_request_ids_are_unique() {
        let (store, oracle) = oracle();
        let a = store.encode_constant(1).unwrap();
        let first = oracle.request_decryption(vec![a], Purpose::AreaStatsReveal).await.unwrap();
        let second = oracle.request_decryption(vec![a], Purpose::AreaStatsReveal).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(oracle.issued_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_fulfill_is_single_use() {
        let (store, oracle) = oracle();
        let a = store.encode_constant(1).unwrap();
        let request_id = oracle.request_decryption(vec![a], Purpose::AreaStatsReveal).await.unwrap();

        oracle.fulfill(&request_id).unwrap();
        assert_eq!(
            oracle.fulfill(&request_id),
            Err(OracleError::UnknownRequest(request_id))
        );
    }

    #[tokio::test]
    async fn test_unavailable_oracle_refuses_requests() {
        let (store, oracle) = oracle();
        let a = store.encode_constant(1).unwrap();
        oracle.set_available(false);
        assert!(matches!(
            oracle.request_decryption(vec![a], Purpose::AreaStatsReveal).await,
            Err(OracleError::Unavailable(_))
        ));
        assert!(oracle.issued_requests().is_empty());
    }

    #[tokio::test]
    async fn test_notifier_receives_request_ids() {
        let (store, oracle) = oracle();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let oracle = oracle.with_notifier(tx);
        let a = store.encode_constant(1).unwrap();

        let request_id = oracle.request_decryption(vec![a], Purpose::AreaStatsReveal).await.unwrap();
        assert_eq!(rx.recv().await, Some(request_id));
    }

    #[test]
    fn test_foreign_proof_rejected() {
        let (_, oracle) = oracle();
        let request_id = RequestId::new();
        let payload = encode_words(&[1, 2]);
        let proof = OracleSigningKey::generate().sign_decryption(&request_id, &payload);
        assert_eq!(
            oracle.check_signatures(&request_id, &payload, &proof),
            Err(OracleError::InvalidProof)
        );
    }
}

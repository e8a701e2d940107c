//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use safeplate_ledger::crypto::{encode_words, OracleSigningKey};
use safeplate_ledger::domain::{
    DecryptionCallback, LocationCode, ReportId, ReportSubmission, RequestId, Resolution,
};
use safeplate_ledger::infra::{
    InMemoryCiphertextStore, LocalDecryptionOracle, NotificationLog, Result, RiskLedgerService,
};
use safeplate_ledger::metrics::MetricsRegistry;
use safeplate_ledger::server::AppState;

/// Default test location code
pub const TEST_LOCATION: u32 = 94107;

/// Fixed sealing key so inputs can be built without the store
pub const TEST_STORE_KEY: [u8; 32] = [7u8; 32];

/// A complete in-process ledger: store, local oracle, service and log.
pub struct TestLedger {
    pub ciphertexts: Arc<InMemoryCiphertextStore>,
    pub oracle: Arc<LocalDecryptionOracle>,
    pub notifications: Arc<NotificationLog>,
    pub metrics: Arc<MetricsRegistry>,
    pub service: RiskLedgerService,
    oracle_key: [u8; 32],
}

impl TestLedger {
    pub fn new() -> Self {
        let oracle_key = OracleSigningKey::generate().to_bytes();
        let ciphertexts = Arc::new(InMemoryCiphertextStore::with_key(TEST_STORE_KEY));
        let oracle = Arc::new(LocalDecryptionOracle::new(
            ciphertexts.clone(),
            OracleSigningKey::from_bytes(&oracle_key),
        ));
        Self::with_oracle(ciphertexts, oracle, oracle_key)
    }

    /// Build around an existing oracle; `oracle_key` must be its signing key
    pub fn with_oracle(
        ciphertexts: Arc<InMemoryCiphertextStore>,
        oracle: Arc<LocalDecryptionOracle>,
        oracle_key: [u8; 32],
    ) -> Self {
        let notifications = Arc::new(NotificationLog::new());
        let metrics = Arc::new(MetricsRegistry::new());
        let service = RiskLedgerService::new(
            ciphertexts.clone(),
            oracle.clone(),
            notifications.clone(),
            metrics.clone(),
        );
        Self {
            ciphertexts,
            oracle,
            notifications,
            metrics,
            service,
            oracle_key,
        }
    }

    pub fn oracle_key(&self) -> [u8; 32] {
        self.oracle_key
    }

    /// A callback for arbitrary `values`, signed with the trusted oracle key
    pub fn signed_callback(&self, request_id: RequestId, values: &[u32]) -> DecryptionCallback {
        let cleartexts = encode_words(values);
        let proof = OracleSigningKey::from_bytes(&self.oracle_key)
            .sign_decryption(&request_id, &cleartexts);
        DecryptionCallback {
            request_id,
            cleartexts,
            proof,
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(self.service.clone(), self.notifications.clone())
    }

    pub fn submission(
        &self,
        hygiene: u32,
        food_safety: u32,
        facility: u32,
        location: u32,
    ) -> ReportSubmission {
        ReportSubmission {
            restaurant_id: self.ciphertexts.seal(4242),
            hygiene: self.ciphertexts.seal(hygiene),
            food_safety: self.ciphertexts.seal(food_safety),
            facility: self.ciphertexts.seal(facility),
            location: LocationCode::new(location),
        }
    }

    pub async fn submit(
        &self,
        hygiene: u32,
        food_safety: u32,
        facility: u32,
        location: u32,
    ) -> ReportId {
        self.service
            .submit_report(&self.submission(hygiene, food_safety, facility, location))
            .await
            .unwrap()
            .id
    }

    /// Have the local oracle decrypt and sign an issued request
    pub fn callback(&self, request_id: &RequestId) -> DecryptionCallback {
        self.oracle.fulfill(request_id).unwrap()
    }

    pub async fn fulfill(&self, request_id: &RequestId) -> Result<Resolution> {
        let callback = self.callback(request_id);
        self.service.resolve(&callback).await
    }

    /// Submit a report and resolve its risk calculation
    pub async fn scored_report(
        &self,
        hygiene: u32,
        food_safety: u32,
        facility: u32,
        location: u32,
    ) -> Resolution {
        let report_id = self.submit(hygiene, food_safety, facility, location).await;
        let request_id = self
            .service
            .request_risk_calculation(report_id)
            .await
            .unwrap();
        self.fulfill(&request_id).await.unwrap()
    }
}

impl Default for TestLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// A callback carrying `values` signed by a key the ledger does not trust
pub fn foreign_callback(request_id: RequestId, values: &[u32]) -> DecryptionCallback {
    let cleartexts = encode_words(values);
    let proof = OracleSigningKey::generate().sign_decryption(&request_id, &cleartexts);
    DecryptionCallback {
        request_id,
        cleartexts,
        proof,
    }
}

/// Hex form of a sealed input, as sent in JSON bodies
pub fn sealed_hex(ciphertexts: &InMemoryCiphertextStore, value: u32) -> String {
    format!("0x{}", hex::encode(ciphertexts.seal(value).as_bytes()))
}

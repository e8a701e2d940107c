//! Risk ledger service
//!
//! Wires the ledger store, ciphertext store, oracle, dispatcher and resolver
//! together behind one handle shared by the REST API, the relayer and tests.

use std::sync::Arc;

use crate::domain::{
    AnalysisId, DecryptTarget, DecryptionCallback, InspectionReport, LocationCode, ReportId,
    ReportSubmission, RequestId, Resolution,
};
use crate::metrics::{metric_names, MetricsRegistry};

use super::{
    CallbackResolver, CiphertextStore, DecryptRequestDispatcher, DecryptionOracle, LedgerStore,
    NotificationSink, Result,
};

#[derive(Clone)]
pub struct RiskLedgerService {
    store: Arc<LedgerStore>,
    ciphertexts: Arc<dyn CiphertextStore>,
    dispatcher: Arc<DecryptRequestDispatcher>,
    resolver: Arc<CallbackResolver>,
    metrics: Arc<MetricsRegistry>,
}

impl RiskLedgerService {
    pub fn new(
        ciphertexts: Arc<dyn CiphertextStore>,
        oracle: Arc<dyn DecryptionOracle>,
        sink: Arc<dyn NotificationSink>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let store = Arc::new(LedgerStore::new(sink));
        let dispatcher = Arc::new(DecryptRequestDispatcher::new(
            store.clone(),
            ciphertexts.clone(),
            oracle.clone(),
            metrics.clone(),
        ));
        let resolver = Arc::new(CallbackResolver::new(
            store.clone(),
            ciphertexts.clone(),
            oracle,
            metrics.clone(),
        ));

        Self {
            store,
            ciphertexts,
            dispatcher,
            resolver,
            metrics,
        }
    }

    pub fn store(&self) -> &Arc<LedgerStore> {
        &self.store
    }

    pub fn resolver(&self) -> &Arc<CallbackResolver> {
        &self.resolver
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub async fn submit_report(&self, submission: &ReportSubmission) -> Result<InspectionReport> {
        let report = self
            .store
            .create_report(self.ciphertexts.as_ref(), submission)
            .await?;
        self.metrics
            .inc_counter(metric_names::REPORTS_SUBMITTED)
            .await;
        Ok(report)
    }

    pub async fn dispatch(&self, target: DecryptTarget) -> Result<RequestId> {
        self.dispatcher.dispatch(target).await
    }

    pub async fn request_risk_calculation(&self, report_id: ReportId) -> Result<RequestId> {
        self.dispatcher.request_risk_calculation(report_id).await
    }

    pub async fn request_analysis_reveal(&self, analysis_id: AnalysisId) -> Result<RequestId> {
        self.dispatcher.request_analysis_reveal(analysis_id).await
    }

    pub async fn request_area_stats(&self, location: LocationCode) -> Result<RequestId> {
        self.dispatcher.request_area_stats(location).await
    }

    pub async fn resolve(&self, callback: &DecryptionCallback) -> Result<Resolution> {
        self.resolver.resolve(callback).await
    }
}

impl std::fmt::Debug for RiskLedgerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskLedgerService").finish_non_exhaustive()
    }
}

//! Decrypt-request dispatcher
//!
//! Builds the ciphertext bundle for a purpose from the ledger, asks the
//! oracle for a request id and records the pending entry before returning.
//! The store's write guard is held across the oracle call, so a callback
//! racing the dispatch always finds its pending entry. Every query and
//! callback waits for that call, so oracle latency is ledger latency.
//!
//! Re-dispatching a risk calculation or a reveal that is still in flight
//! supersedes the earlier request: its pending entry is dropped and a late
//! callback for it fails `UnknownOrReplayedRequest`.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::domain::{
    AnalysisId, AnalysisStatus, CiphertextHandle, DecryptTarget, LocationCode, Notification,
    PendingRequest, ReportId, ReportStatus, RequestId,
};
use crate::metrics::{metric_names, MetricsRegistry};

use super::{CiphertextStore, DecryptionOracle, EntityLedger, LedgerError, LedgerStore, Result};

pub struct DecryptRequestDispatcher {
    store: Arc<LedgerStore>,
    ciphertexts: Arc<dyn CiphertextStore>,
    oracle: Arc<dyn DecryptionOracle>,
    metrics: Arc<MetricsRegistry>,
}

impl DecryptRequestDispatcher {
    pub fn new(
        store: Arc<LedgerStore>,
        ciphertexts: Arc<dyn CiphertextStore>,
        oracle: Arc<dyn DecryptionOracle>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            store,
            ciphertexts,
            oracle,
            metrics,
        }
    }

    /// Dispatch a decrypt request for `target`.
    ///
    /// On any failure the pending table and the ledger are unchanged.
    #[instrument(skip(self), fields(purpose = %target.purpose(), target = %target.describe()))]
    pub async fn dispatch(&self, target: DecryptTarget) -> Result<RequestId> {
        let purpose = target.purpose();
        let mut state = self.store.write().await;

        let bundle = self.build_bundle(state.ledger(), &target)?;
        if bundle.is_empty() || bundle.len() != purpose.arity() {
            return Err(LedgerError::MalformedBundle {
                purpose,
                expected: purpose.arity(),
                actual: bundle.len(),
            });
        }
        debug!(ciphertexts = bundle.len(), "Bundle built");
        let superseded = Self::in_flight_request(state.ledger(), &target);

        let request_id = match self.oracle.request_decryption(bundle, purpose).await {
            Ok(request_id) => request_id,
            Err(e) => {
                drop(state);
                warn!(error = %e, "Oracle refused decryption request");
                self.metrics
                    .inc_counter(metric_names::DECRYPT_DISPATCH_FAILED)
                    .await;
                return Err(LedgerError::OracleUnavailable(e.to_string()));
            }
        };

        let table = state.pending_mut();
        table.insert(PendingRequest::new(request_id, target))?;
        if let Some(previous) = superseded {
            table.take(&previous);
            info!(superseded = %previous, "Superseded in-flight request");
        }

        // Targets were validated while building the bundle
        match target {
            DecryptTarget::RiskCalculation { report_id } => {
                let ledger = state.ledger_mut();
                ledger.set_report_status(report_id, ReportStatus::RiskRequested { request_id })?;
                ledger.record_notification(Notification::AnalysisRequested { report_id });
            }
            DecryptTarget::AnalysisReveal { analysis_id } => {
                state
                    .ledger_mut()
                    .set_analysis_status(analysis_id, AnalysisStatus::RevealRequested { request_id })?;
            }
            DecryptTarget::AreaStatsReveal { .. } => {}
        }

        self.store.publish(&mut state);
        let pending = state.pending().len();
        drop(state);

        self.metrics
            .inc_counter(metric_names::DECRYPT_DISPATCHED)
            .await;
        self.metrics
            .set_gauge(metric_names::PENDING_REQUESTS, pending as u64)
            .await;

        info!(request_id = %request_id, "Decrypt request dispatched");
        Ok(request_id)
    }

    pub async fn request_risk_calculation(&self, report_id: ReportId) -> Result<RequestId> {
        self.dispatch(DecryptTarget::RiskCalculation { report_id })
            .await
    }

    pub async fn request_analysis_reveal(&self, analysis_id: AnalysisId) -> Result<RequestId> {
        self.dispatch(DecryptTarget::AnalysisReveal { analysis_id })
            .await
    }

    pub async fn request_area_stats(&self, location: LocationCode) -> Result<RequestId> {
        self.dispatch(DecryptTarget::AreaStatsReveal { location })
            .await
    }

    /// Ciphertexts for `target` in its purpose's schema order
    fn build_bundle(
        &self,
        ledger: &EntityLedger,
        target: &DecryptTarget,
    ) -> Result<Vec<CiphertextHandle>> {
        let unknown = || LedgerError::UnknownTarget {
            purpose: target.purpose(),
            target: target.describe(),
        };

        match *target {
            DecryptTarget::RiskCalculation { report_id } => {
                let report = ledger.report(report_id).map_err(|_| unknown())?;
                if !matches!(
                    report.status,
                    ReportStatus::Created | ReportStatus::RiskRequested { .. }
                ) {
                    return Err(LedgerError::InvalidStateTransition {
                        entity: target.describe(),
                        from: report.status.name(),
                        to: "risk_requested",
                    });
                }

                let location = self.ciphertexts.encode_constant(report.location.as_u32())?;
                Ok(vec![
                    report.fields.hygiene,
                    report.fields.food_safety,
                    report.fields.facility,
                    location,
                ])
            }
            DecryptTarget::AnalysisReveal { analysis_id } => {
                let analysis = ledger.analysis(analysis_id).map_err(|_| unknown())?;
                match analysis.status {
                    AnalysisStatus::Revealed => Err(LedgerError::AlreadyRevealed(analysis_id)),
                    AnalysisStatus::Unrevealed | AnalysisStatus::RevealRequested { .. } => {
                        Ok(vec![analysis.risk_score, analysis.priority_level])
                    }
                }
            }
            DecryptTarget::AreaStatsReveal { location } => {
                let aggregate = ledger.area_aggregate(location).ok_or_else(unknown)?;
                Ok(vec![aggregate.hygiene_sum, aggregate.high_risk_count])
            }
        }
    }

    /// Request a dispatch for `target` would replace
    fn in_flight_request(ledger: &EntityLedger, target: &DecryptTarget) -> Option<RequestId> {
        match *target {
            DecryptTarget::RiskCalculation { report_id } => {
                match ledger.report(report_id).ok()?.status {
                    ReportStatus::RiskRequested { request_id } => Some(request_id),
                    _ => None,
                }
            }
            DecryptTarget::AnalysisReveal { analysis_id } => {
                match ledger.analysis(analysis_id).ok()?.status {
                    AnalysisStatus::RevealRequested { request_id } => Some(request_id),
                    _ => None,
                }
            }
            DecryptTarget::AreaStatsReveal { .. } => None,
        }
    }
}

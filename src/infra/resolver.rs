//! Callback verifier & resolver
//!
//! Applies an oracle callback exactly once:
//!
//! 1. pending lookup (`UnknownOrReplayedRequest`)
//! 2. proof check over the raw payload (`InvalidProof`)
//! 3. decode into the purpose's schema (`MalformedPayload`)
//! 4. stage every ciphertext operation the transition needs
//! 5. commit: consume the pending entry and mutate the ledger together
//!
//! The store's write guard is held from step 1 to step 5, and nothing in
//! steps 1-4 mutates a table, so any failure leaves the pending entry and the
//! ledger exactly as they were.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::crypto::decode_words;
use crate::domain::{
    AnalysisId, AnalysisStatus, AreaStats, DecryptTarget, DecryptionCallback, LocationCode,
    PendingRequest, ReportId, ReportStatus, RequestId, Resolution, RevealedRisk, MAX_SCORE,
};
use crate::metrics::{metric_names, MetricsRegistry};
use crate::risk::{self, InspectionScores, OutOfRange};

use super::{CiphertextStore, DecryptionOracle, LedgerError, LedgerState, LedgerStore, Result};

pub struct CallbackResolver {
    store: Arc<LedgerStore>,
    ciphertexts: Arc<dyn CiphertextStore>,
    oracle: Arc<dyn DecryptionOracle>,
    metrics: Arc<MetricsRegistry>,
}

/// A committed resolution and the bookkeeping needed to report it
struct Committed {
    resolution: Resolution,
    pending: PendingRequest,
    remaining: usize,
}

impl CallbackResolver {
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

    #[instrument(skip(self, callback), fields(request_id = %callback.request_id))]
    pub async fn resolve(&self, callback: &DecryptionCallback) -> Result<Resolution> {
        match self.resolve_locked(callback).await {
            Ok(committed) => {
                let latency = (Utc::now() - committed.pending.dispatched_at)
                    .to_std()
                    .map(|d| d.as_secs_f64())
                    .unwrap_or(0.0);

                self.metrics
                    .inc_counter(metric_names::CALLBACKS_RESOLVED)
                    .await;
                self.metrics
                    .set_gauge(metric_names::PENDING_REQUESTS, committed.remaining as u64)
                    .await;
                self.metrics
                    .observe_histogram(metric_names::CALLBACK_LATENCY, latency)
                    .await;

                info!(
                    purpose = %committed.pending.purpose(),
                    target = %committed.pending.target.describe(),
                    latency_secs = latency,
                    "Callback resolved"
                );
                Ok(committed.resolution)
            }
            Err(e) => {
                self.metrics
                    .inc_labelled(metric_names::CALLBACKS_REJECTED, e.metric_label())
                    .await;
                warn!(error = %e, reason = e.metric_label(), "Callback rejected");
                Err(e)
            }
        }
    }

    async fn resolve_locked(&self, callback: &DecryptionCallback) -> Result<Committed> {
        let request_id = callback.request_id;
        let mut state = self.store.write().await;

        let pending = state
            .pending()
            .get(&request_id)
            .cloned()
            .ok_or(LedgerError::UnknownOrReplayedRequest(request_id))?;

        self.oracle
            .check_signatures(&request_id, &callback.cleartexts, &callback.proof)
            .map_err(|_| LedgerError::InvalidProof(request_id))?;

        let values = decode_words(&callback.cleartexts, pending.purpose().arity())
            .map_err(|e| LedgerError::malformed_payload(request_id, e))?;

        let resolution = match pending.target {
            DecryptTarget::RiskCalculation { report_id } => {
                self.apply_risk_calculation(&mut state, request_id, report_id, &values)?
            }
            DecryptTarget::AnalysisReveal { analysis_id } => {
                Self::apply_analysis_reveal(&mut state, request_id, analysis_id, &values)?
            }
            DecryptTarget::AreaStatsReveal { location } => {
                Self::apply_area_stats(&mut state, request_id, location, &values)
            }
        };

        self.store.publish(&mut state);
        Ok(Committed {
            resolution,
            pending,
            remaining: state.pending().len(),
        })
    }

    /// `[hygiene, food_safety, facility, location_code]`
    fn apply_risk_calculation(
        &self,
        state: &mut LedgerState,
        request_id: RequestId,
        report_id: ReportId,
        values: &[u32],
    ) -> Result<Resolution> {
        let scores = InspectionScores::new(values[0], values[1], values[2]).map_err(
            |OutOfRange { field, value }| LedgerError::ScoreOutOfRange {
                request_id,
                field,
                value,
            },
        )?;

        let report = state.ledger().report(report_id)?;
        if report.status != (ReportStatus::RiskRequested { request_id }) {
            return Err(LedgerError::InvalidStateTransition {
                entity: format!("report/{report_id}"),
                from: report.status.name(),
                to: "risk_resolved",
            });
        }
        if values[3] != report.location.as_u32() {
            return Err(LedgerError::MalformedPayload {
                request_id,
                reason: format!(
                    "location code {} does not match report location {}",
                    values[3], report.location
                ),
            });
        }

        let assessment = risk::assess(&scores);
        let location = report.location;
        let hygiene = report.fields.hygiene;

        // Stage
        let risk_handle = self.ciphertexts.encode_constant(assessment.risk_score)?;
        let priority_handle = self.ciphertexts.encode_constant(assessment.priority_level)?;
        let high_risk_handle = self
            .ciphertexts
            .encode_constant(risk::high_risk_delta(assessment.risk_score))?;
        let area = state.ledger().prepare_area_update(
            self.ciphertexts.as_ref(),
            location,
            &hygiene,
            &high_risk_handle,
        )?;

        // Commit
        let (ledger, pending) = state.tables_mut();
        let analysis_id =
            ledger.commit_risk_analysis(report_id, risk_handle, priority_handle, area)?;
        pending.take(&request_id);

        info!(
            report_id = %report_id,
            analysis_id = %analysis_id,
            high_risk = assessment.high_risk,
            "Risk analysis recorded"
        );
        Ok(Resolution::RiskCalculated {
            report_id,
            analysis_id,
        })
    }

    /// `[risk_score, priority_level]`
    fn apply_analysis_reveal(
        state: &mut LedgerState,
        request_id: RequestId,
        analysis_id: AnalysisId,
        values: &[u32],
    ) -> Result<Resolution> {
        let (risk_score, priority_level) = (values[0], values[1]);
        let malformed = |reason: String| LedgerError::MalformedPayload { request_id, reason };

        if risk_score > 3 * MAX_SCORE {
            return Err(malformed(format!("risk score {risk_score} exceeds {}", 3 * MAX_SCORE)));
        }
        if !risk::is_valid_priority(priority_level) {
            return Err(malformed(format!(
                "priority level {priority_level} outside 1..=3"
            )));
        }
        if risk::priority_level(risk_score) != priority_level {
            return Err(malformed(format!(
                "priority level {priority_level} inconsistent with risk score {risk_score}"
            )));
        }

        let analysis = state.ledger().analysis(analysis_id)?;
        match analysis.status {
            AnalysisStatus::RevealRequested { request_id: expected } if expected == request_id => {}
            AnalysisStatus::Revealed => return Err(LedgerError::AlreadyRevealed(analysis_id)),
            status => {
                return Err(LedgerError::InvalidStateTransition {
                    entity: format!("analysis/{analysis_id}"),
                    from: status.name(),
                    to: "revealed",
                })
            }
        }

        let (ledger, pending) = state.tables_mut();
        ledger.mark_analysis_revealed(
            analysis_id,
            Some(RevealedRisk {
                risk_score,
                priority_level,
            }),
        )?;
        pending.take(&request_id);

        info!(analysis_id = %analysis_id, "Analysis revealed");
        Ok(Resolution::AnalysisRevealed {
            analysis_id,
            risk_score,
            priority_level,
        })
    }

    /// `[hygiene_sum, high_risk_count]`; only the pending entry changes.
    fn apply_area_stats(
        state: &mut LedgerState,
        request_id: RequestId,
        location: LocationCode,
        values: &[u32],
    ) -> Resolution {
        state.pending_mut().take(&request_id);
        Resolution::AreaStatsRevealed(AreaStats {
            location,
            hygiene_sum: values[0],
            high_risk_count: values[1],
        })
    }
}

//! Shared ledger store
//!
//! The entity ledger and the pending-request table behind one
//! `tokio::sync::RwLock`. Mutating entry points hold the write guard for
//! their whole critical unit; queries take the read guard. Notifications
//! recorded by a mutation are published while the guard is still held, so
//! subscribers observe them in commit order.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

use crate::domain::{
    AnalysisId, AreaAggregate, EncryptedReportFields, InspectionReport, LocationCode,
    PendingRequest, ReportId, ReportSubmission, RequestId, RiskAnalysis, MAX_SCORE,
};

use super::{CiphertextStore, EntityLedger, NotificationSink, PendingRequestTable, Result};

/// Tables guarded together by the store lock
#[derive(Debug, Default)]
pub struct LedgerState {
    ledger: EntityLedger,
    pending: PendingRequestTable,
}

impl LedgerState {
    pub fn ledger(&self) -> &EntityLedger {
        &self.ledger
    }

    pub fn pending(&self) -> &PendingRequestTable {
        &self.pending
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut EntityLedger {
        &mut self.ledger
    }

    pub(crate) fn pending_mut(&mut self) -> &mut PendingRequestTable {
        &mut self.pending
    }

    /// Split borrow for transitions that touch both tables
    pub(crate) fn tables_mut(&mut self) -> (&mut EntityLedger, &mut PendingRequestTable) {
        (&mut self.ledger, &mut self.pending)
    }
}

/// Entity and pending-request counts at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    pub report_count: u64,
    pub analysis_count: u64,
    pub area_count: usize,
    pub pending_requests: usize,
}

pub struct LedgerStore {
    state: RwLock<LedgerState>,
    sink: Arc<dyn NotificationSink>,
}

impl LedgerStore {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            sink,
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().await
    }

    /// Publish notifications recorded since the last commit
    pub(crate) fn publish(&self, state: &mut LedgerState) {
        for notification in state.ledger.take_notifications() {
            self.sink.publish(notification);
        }
    }

    /// Accept a report's encrypted fields and append it to the ledger.
    ///
    /// Every input is converted by the ciphertext store before the ledger is
    /// touched, so a malformed field leaves the ledger unchanged. Score fields
    /// must seal a value in `0..=MAX_SCORE`.
    pub async fn create_report(
        &self,
        ciphertexts: &dyn CiphertextStore,
        submission: &ReportSubmission,
    ) -> Result<InspectionReport> {
        let fields = EncryptedReportFields {
            restaurant_id: ciphertexts.to_opaque_handle(&submission.restaurant_id)?,
            hygiene: ciphertexts.to_bounded_handle(&submission.hygiene, MAX_SCORE)?,
            food_safety: ciphertexts.to_bounded_handle(&submission.food_safety, MAX_SCORE)?,
            facility: ciphertexts.to_bounded_handle(&submission.facility, MAX_SCORE)?,
        };

        let mut state = self.write().await;
        let report = state
            .ledger
            .create_report(fields, submission.location)
            .clone();
        self.publish(&mut state);

        info!(
            report_id = %report.id,
            location = %report.location,
            "Report submitted"
        );
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub async fn report_count(&self) -> u64 {
        self.read().await.ledger.report_count()
    }

    pub async fn analysis_count(&self) -> u64 {
        self.read().await.ledger.analysis_count()
    }

    pub async fn is_analysis_revealed(&self, id: AnalysisId) -> bool {
        self.read().await.ledger.is_analysis_revealed(id)
    }

    pub async fn report(&self, id: ReportId) -> Result<InspectionReport> {
        self.read().await.ledger.report(id).cloned()
    }

    pub async fn analysis(&self, id: AnalysisId) -> Result<RiskAnalysis> {
        self.read().await.ledger.analysis(id).cloned()
    }

    pub async fn area_aggregate(&self, location: LocationCode) -> Option<AreaAggregate> {
        self.read().await.ledger.area_aggregate(location).copied()
    }

    pub async fn pending_count(&self) -> usize {
        self.read().await.pending.len()
    }

    pub async fn is_pending(&self, request_id: &RequestId) -> bool {
        self.read().await.pending.contains(request_id)
    }

    pub async fn pending_requests(&self) -> Vec<PendingRequest> {
        self.read().await.pending.list()
    }

    pub async fn snapshot(&self) -> LedgerSnapshot {
        let state = self.read().await;
        LedgerSnapshot {
            report_count: state.ledger.report_count(),
            analysis_count: state.ledger.analysis_count(),
            area_count: state.ledger.area_count(),
            pending_requests: state.pending.len(),
        }
    }
}

impl std::fmt::Debug for LedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerStore").finish_non_exhaustive()
    }
}

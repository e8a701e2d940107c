//! Entity ledger
//!
//! Report, analysis and area-aggregate tables. Ids are positions in
//! append-only vectors, so they are dense, start at 1 and never repeat.
//! Every mutation records its notification in an outbox that the owning
//! [`super::LedgerStore`] publishes once the enclosing operation commits.

use std::collections::HashMap;

use chrono::Utc;

use crate::domain::{
    AnalysisId, AnalysisStatus, AreaAggregate, CiphertextHandle, EncryptedReportFields,
    InspectionReport, LocationCode, Notification, ReportId, ReportStatus, RevealedRisk,
    RiskAnalysis,
};

use super::{CiphertextStore, LedgerError, Result};

#[derive(Debug, Default)]
pub struct EntityLedger {
    reports: Vec<InspectionReport>,
    analyses: Vec<RiskAnalysis>,
    areas: HashMap<LocationCode, AreaAggregate>,
    outbox: Vec<Notification>,
}

impl EntityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------------

    /// Append a report and emit `ReportSubmitted`.
    pub fn create_report(
        &mut self,
        fields: EncryptedReportFields,
        location: LocationCode,
    ) -> &InspectionReport {
        let id = ReportId::new(self.reports.len() as u64 + 1);
        let submitted_at = Utc::now();

        self.reports.push(InspectionReport {
            id,
            fields,
            location,
            submitted_at,
            status: ReportStatus::Created,
        });
        self.outbox.push(Notification::ReportSubmitted {
            report_id: id,
            timestamp: submitted_at,
        });

        &self.reports[self.reports.len() - 1]
    }

    pub fn report(&self, id: ReportId) -> Result<&InspectionReport> {
        Self::index(id.as_u64())
            .and_then(|i| self.reports.get(i))
            .ok_or(LedgerError::UnknownReport(id))
    }

    pub(crate) fn set_report_status(&mut self, id: ReportId, status: ReportStatus) -> Result<()> {
        let report = Self::index(id.as_u64())
            .and_then(|i| self.reports.get_mut(i))
            .ok_or(LedgerError::UnknownReport(id))?;
        report.status = status;
        Ok(())
    }

    pub(crate) fn record_notification(&mut self, notification: Notification) {
        self.outbox.push(notification);
    }

    pub fn report_count(&self) -> u64 {
        self.reports.len() as u64
    }

    // ------------------------------------------------------------------------
    // Analyses
    // ------------------------------------------------------------------------

    /// Append an unrevealed analysis and emit `RiskIdentified`.
    pub fn create_analysis(
        &mut self,
        report_id: ReportId,
        risk_score: CiphertextHandle,
        priority_level: CiphertextHandle,
    ) -> AnalysisId {
        let id = AnalysisId::new(self.analyses.len() as u64 + 1);

        self.analyses.push(RiskAnalysis {
            id,
            report_id,
            risk_score,
            priority_level,
            status: AnalysisStatus::Unrevealed,
            revealed: None,
            created_at: Utc::now(),
        });
        self.outbox.push(Notification::RiskIdentified { analysis_id: id });

        id
    }

    pub fn analysis(&self, id: AnalysisId) -> Result<&RiskAnalysis> {
        Self::index(id.as_u64())
            .and_then(|i| self.analyses.get(i))
            .ok_or(LedgerError::UnknownAnalysis(id))
    }

    fn analysis_mut(&mut self, id: AnalysisId) -> Result<&mut RiskAnalysis> {
        Self::index(id.as_u64())
            .and_then(|i| self.analyses.get_mut(i))
            .ok_or(LedgerError::UnknownAnalysis(id))
    }

    /// Check that `mark_analysis_revealed` would succeed, without mutating.
    pub fn ensure_revealable(&self, id: AnalysisId) -> Result<&RiskAnalysis> {
        let analysis = self.analysis(id)?;
        if analysis.is_revealed() {
            return Err(LedgerError::AlreadyRevealed(id));
        }
        Ok(analysis)
    }

    /// Flip `revealed` to true and emit `AnalysisRevealed`.
    ///
    /// Fails `UnknownAnalysis` for 0 or an id past the count, and
    /// `AlreadyRevealed` on a second call; the flag stays true either way.
    pub fn mark_analysis_revealed(
        &mut self,
        id: AnalysisId,
        cleartext: Option<RevealedRisk>,
    ) -> Result<()> {
        self.ensure_revealable(id)?;

        let analysis = self.analysis_mut(id)?;
        analysis.status = AnalysisStatus::Revealed;
        analysis.revealed = cleartext;
        self.outbox
            .push(Notification::AnalysisRevealed { analysis_id: id });
        Ok(())
    }

    pub(crate) fn set_analysis_status(
        &mut self,
        id: AnalysisId,
        status: AnalysisStatus,
    ) -> Result<()> {
        self.analysis_mut(id)?.status = status;
        Ok(())
    }

    pub fn analysis_count(&self) -> u64 {
        self.analyses.len() as u64
    }

    /// False for unknown ids.
    pub fn is_analysis_revealed(&self, id: AnalysisId) -> bool {
        self.analysis(id).map(|a| a.is_revealed()).unwrap_or(false)
    }

    // ------------------------------------------------------------------------
    // Area aggregates
    // ------------------------------------------------------------------------

    pub fn area_aggregate(&self, location: LocationCode) -> Option<&AreaAggregate> {
        self.areas.get(&location)
    }

    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    /// Compute the next value of an area aggregate without storing it.
    ///
    /// An absent or null-handle aggregate starts from encrypted zero. All
    /// ciphertext arithmetic happens here so that the matching
    /// [`Self::apply_area_update`] cannot fail.
    pub fn prepare_area_update(
        &self,
        ciphertexts: &dyn CiphertextStore,
        location: LocationCode,
        hygiene_delta: &CiphertextHandle,
        high_risk_delta: &CiphertextHandle,
    ) -> Result<AreaAggregate> {
        let existing = self
            .areas
            .get(&location)
            .filter(|a| !ciphertexts.is_zero(&a.hygiene_sum));

        let (hygiene_sum, high_risk_count, contributions) = match existing {
            Some(aggregate) => (
                aggregate.hygiene_sum,
                aggregate.high_risk_count,
                aggregate.contributions,
            ),
            None => {
                let zero = ciphertexts.encode_constant(0)?;
                (zero, zero, 0)
            }
        };

        Ok(AreaAggregate {
            location,
            hygiene_sum: ciphertexts.add(&hygiene_sum, hygiene_delta)?,
            high_risk_count: ciphertexts.add(&high_risk_count, high_risk_delta)?,
            contributions: contributions + 1,
        })
    }

    pub fn apply_area_update(&mut self, aggregate: AreaAggregate) {
        self.areas.insert(aggregate.location, aggregate);
    }

    /// Record a scored report: new analysis, resolved report status and the
    /// prepared area aggregate. Fails only before mutating anything.
    pub(crate) fn commit_risk_analysis(
        &mut self,
        report_id: ReportId,
        risk_score: CiphertextHandle,
        priority_level: CiphertextHandle,
        area: AreaAggregate,
    ) -> Result<AnalysisId> {
        let index = Self::index(report_id.as_u64())
            .filter(|i| *i < self.reports.len())
            .ok_or(LedgerError::UnknownReport(report_id))?;

        let analysis_id = self.create_analysis(report_id, risk_score, priority_level);
        self.reports[index].status = ReportStatus::RiskResolved { analysis_id };
        self.apply_area_update(area);
        Ok(analysis_id)
    }

    /// Lazily create and then additively update an area aggregate.
    pub fn upsert_area_aggregate(
        &mut self,
        ciphertexts: &dyn CiphertextStore,
        location: LocationCode,
        hygiene_delta: &CiphertextHandle,
        high_risk_delta: &CiphertextHandle,
    ) -> Result<&AreaAggregate> {
        let next =
            self.prepare_area_update(ciphertexts, location, hygiene_delta, high_risk_delta)?;
        self.apply_area_update(next);
        Ok(&self.areas[&location])
    }

    // ------------------------------------------------------------------------

    pub(crate) fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }

    fn index(id: u64) -> Option<usize> {
        id.checked_sub(1).map(|i| i as usize)
    }
}

//! Ledger entities: inspection reports, risk analyses and area aggregates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AnalysisId, CiphertextHandle, EncryptedInput, LocationCode, ReportId, RequestId};

/// Encrypted fields submitted by an inspector, before the ciphertext store
/// has accepted them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSubmission {
    pub restaurant_id: EncryptedInput,
    pub hygiene: EncryptedInput,
    pub food_safety: EncryptedInput,
    pub facility: EncryptedInput,
    pub location: LocationCode,
}

/// Accepted ciphertext handles for a report's confidential fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedReportFields {
    pub restaurant_id: CiphertextHandle,
    pub hygiene: CiphertextHandle,
    pub food_safety: CiphertextHandle,
    pub facility: CiphertextHandle,
}

/// Lifecycle position of a report in the risk pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReportStatus {
    Created,
    RiskRequested { request_id: RequestId },
    RiskResolved { analysis_id: AnalysisId },
}

impl ReportStatus {
    pub fn name(&self) -> &'static str {
        match self {
            ReportStatus::Created => "created",
            ReportStatus::RiskRequested { .. } => "risk_requested",
            ReportStatus::RiskResolved { .. } => "risk_resolved",
        }
    }
}

/// An immutable inspection report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionReport {
    pub id: ReportId,
    pub fields: EncryptedReportFields,
    pub location: LocationCode,
    pub submitted_at: DateTime<Utc>,
    pub status: ReportStatus,
}

/// Reveal lifecycle of a risk analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AnalysisStatus {
    Unrevealed,
    RevealRequested { request_id: RequestId },
    Revealed,
}

impl AnalysisStatus {
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisStatus::Unrevealed => "unrevealed",
            AnalysisStatus::RevealRequested { .. } => "reveal_requested",
            AnalysisStatus::Revealed => "revealed",
        }
    }
}

/// Authoritative cleartext of a revealed analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedRisk {
    pub risk_score: u32,
    pub priority_level: u32,
}

/// Encrypted risk classification derived from one report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub id: AnalysisId,
    pub report_id: ReportId,
    pub risk_score: CiphertextHandle,
    pub priority_level: CiphertextHandle,
    pub status: AnalysisStatus,
    pub revealed: Option<RevealedRisk>,
    pub created_at: DateTime<Utc>,
}

impl RiskAnalysis {
    pub fn is_revealed(&self) -> bool {
        matches!(self.status, AnalysisStatus::Revealed)
    }
}

/// Per-location running totals, only ever added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaAggregate {
    pub location: LocationCode,
    pub hygiene_sum: CiphertextHandle,
    pub high_risk_count: CiphertextHandle,
    pub contributions: u64,
}

/// Decrypted area statistics returned by an `AreaStatsReveal` callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaStats {
    pub location: LocationCode,
    pub hygiene_sum: u32,
    pub high_risk_count: u32,
}

/// Outcome of a successfully resolved oracle callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// A report's risk was scored; the analysis stays encrypted.
    RiskCalculated {
        report_id: ReportId,
        analysis_id: AnalysisId,
    },
    AnalysisRevealed {
        analysis_id: AnalysisId,
        risk_score: u32,
        priority_level: u32,
    },
    AreaStatsRevealed(AreaStats),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!(ReportStatus::Created.name(), "created");
        assert_eq!(
            AnalysisStatus::RevealRequested {
                request_id: RequestId::new()
            }
            .name(),
            "reveal_requested"
        );
    }

    #[test]
    fn test_resolution_json_shape() {
        let resolution = Resolution::AreaStatsRevealed(AreaStats {
            location: LocationCode::new(7),
            hygiene_sum: 160,
            high_risk_count: 1,
        });
        let json = serde_json::to_value(resolution).unwrap();
        assert_eq!(json["kind"], "area_stats_revealed");
        assert_eq!(json["hygiene_sum"], 160);
    }
}

//! Shared request and response types for REST API handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AnalysisId, AnalysisStatus, AreaAggregate, CiphertextHandle, DecryptTarget,
    EncryptedInput, EncryptedReportFields, InspectionReport, LocationCode, Purpose, ReportId,
    ReportStatus, ReportSubmission, RequestId, RiskAnalysis,
};

// ============================================================================
// Reports
// ============================================================================

/// Request body for report submission. Encrypted fields are `0x` hex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReportRequest {
    pub restaurant_id: EncryptedInput,
    pub hygiene: EncryptedInput,
    pub food_safety: EncryptedInput,
    pub facility: EncryptedInput,
    pub location_code: u32,
}

impl From<SubmitReportRequest> for ReportSubmission {
    fn from(request: SubmitReportRequest) -> Self {
        ReportSubmission {
            restaurant_id: request.restaurant_id,
            hygiene: request.hygiene,
            food_safety: request.food_safety,
            facility: request.facility,
            location: LocationCode::new(request.location_code),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitReportResponse {
    pub report_id: ReportId,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report_id: ReportId,
    pub location_code: LocationCode,
    pub submitted_at: DateTime<Utc>,
    pub status: ReportStatus,
    pub fields: EncryptedReportFields,
}

impl From<InspectionReport> for ReportResponse {
    fn from(report: InspectionReport) -> Self {
        Self {
            report_id: report.id,
            location_code: report.location,
            submitted_at: report.submitted_at,
            status: report.status,
            fields: report.fields,
        }
    }
}

// ============================================================================
// Analyses
// ============================================================================

/// Cleartext scores appear only once the analysis is revealed.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub analysis_id: AnalysisId,
    pub report_id: ReportId,
    pub revealed: bool,
    pub status: AnalysisStatus,
    pub risk_score_handle: CiphertextHandle,
    pub priority_level_handle: CiphertextHandle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_level: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl From<RiskAnalysis> for AnalysisResponse {
    fn from(analysis: RiskAnalysis) -> Self {
        Self {
            analysis_id: analysis.id,
            report_id: analysis.report_id,
            revealed: analysis.is_revealed(),
            status: analysis.status,
            risk_score_handle: analysis.risk_score,
            priority_level_handle: analysis.priority_level,
            risk_score: analysis.revealed.map(|r| r.risk_score),
            priority_level: analysis.revealed.map(|r| r.priority_level),
            created_at: analysis.created_at,
        }
    }
}

// ============================================================================
// Areas
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct AreaResponse {
    pub location_code: LocationCode,
    pub hygiene_sum_handle: CiphertextHandle,
    pub high_risk_count_handle: CiphertextHandle,
    pub contributions: u64,
}

impl From<AreaAggregate> for AreaResponse {
    fn from(aggregate: AreaAggregate) -> Self {
        Self {
            location_code: aggregate.location,
            hygiene_sum_handle: aggregate.hygiene_sum,
            high_risk_count_handle: aggregate.high_risk_count,
            contributions: aggregate.contributions,
        }
    }
}

// ============================================================================
// Decrypt requests
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub request_id: RequestId,
    pub purpose: Purpose,
    pub target: String,
}

impl DispatchResponse {
    pub fn new(request_id: RequestId, target: DecryptTarget) -> Self {
        Self {
            request_id,
            purpose: target.purpose(),
            target: target.describe(),
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub report_count: u64,
    pub analysis_count: u64,
    pub pending_requests: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationsQuery {
    /// Only return notifications with a greater sequence number
    pub after: Option<u64>,
    /// Page size, capped at [`MAX_NOTIFICATION_PAGE`]
    pub limit: Option<usize>,
}

/// Largest page served by `GET /api/v1/notifications`
pub const MAX_NOTIFICATION_PAGE: usize = 1000;

impl NotificationsQuery {
    pub fn page_size(&self) -> usize {
        self.limit
            .unwrap_or(MAX_NOTIFICATION_PAGE)
            .min(MAX_NOTIFICATION_PAGE)
    }
}

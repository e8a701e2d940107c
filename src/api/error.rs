//! Structured API error responses with error codes
//!
//! Every handler failure becomes an [`ApiError`] with a stable
//! machine-readable code, a numeric code and an HTTP status.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::infra::{CiphertextError, LedgerError};

// ============================================================================
// Error Codes
// ============================================================================

/// Error codes for API responses
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    InvalidRequestBody,
    InvalidFieldValue,
    /// Encrypted input rejected by the ciphertext store
    MalformedEncryptedInput,

    // Resource errors (2xxx)
    ReportNotFound,
    AnalysisNotFound,
    AreaNotFound,
    /// Dispatch target does not exist
    UnknownTarget,

    // Callback trust errors (3xxx)
    UnknownOrReplayedRequest,
    InvalidProof,
    MalformedPayload,
    ScoreOutOfRange,

    // State errors (4xxx)
    AlreadyRevealed,
    InvalidStateTransition,
    MalformedBundle,

    // Infrastructure errors (8xxx)
    OracleUnavailable,
    CiphertextBackendError,
    ConfigurationError,
    InternalError,
}

impl ErrorCode {
    pub fn numeric_code(&self) -> u32 {
        match self {
            ErrorCode::InvalidRequestBody => 1001,
            ErrorCode::InvalidFieldValue => 1002,
            ErrorCode::MalformedEncryptedInput => 1003,

            ErrorCode::ReportNotFound => 2001,
            ErrorCode::AnalysisNotFound => 2002,
            ErrorCode::AreaNotFound => 2003,
            ErrorCode::UnknownTarget => 2004,

            ErrorCode::UnknownOrReplayedRequest => 3001,
            ErrorCode::InvalidProof => 3002,
            ErrorCode::MalformedPayload => 3003,
            ErrorCode::ScoreOutOfRange => 3004,

            ErrorCode::AlreadyRevealed => 4001,
            ErrorCode::InvalidStateTransition => 4002,
            ErrorCode::MalformedBundle => 4003,

            ErrorCode::OracleUnavailable => 8001,
            ErrorCode::CiphertextBackendError => 8002,
            ErrorCode::ConfigurationError => 8003,
            ErrorCode::InternalError => 8999,
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequestBody
            | ErrorCode::InvalidFieldValue
            | ErrorCode::MalformedEncryptedInput => StatusCode::BAD_REQUEST,

            ErrorCode::ReportNotFound
            | ErrorCode::AnalysisNotFound
            | ErrorCode::AreaNotFound
            | ErrorCode::UnknownTarget => StatusCode::NOT_FOUND,

            // A replay is a conflict with already-applied state
            ErrorCode::UnknownOrReplayedRequest => StatusCode::CONFLICT,
            ErrorCode::InvalidProof | ErrorCode::MalformedPayload | ErrorCode::ScoreOutOfRange => {
                StatusCode::BAD_REQUEST
            }

            ErrorCode::AlreadyRevealed | ErrorCode::InvalidStateTransition => StatusCode::CONFLICT,
            ErrorCode::MalformedBundle => StatusCode::INTERNAL_SERVER_ERROR,

            ErrorCode::OracleUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::CiphertextBackendError
            | ErrorCode::ConfigurationError
            | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequestBody => "INVALID_REQUEST_BODY",
            ErrorCode::InvalidFieldValue => "INVALID_FIELD_VALUE",
            ErrorCode::MalformedEncryptedInput => "MALFORMED_ENCRYPTED_INPUT",
            ErrorCode::ReportNotFound => "REPORT_NOT_FOUND",
            ErrorCode::AnalysisNotFound => "ANALYSIS_NOT_FOUND",
            ErrorCode::AreaNotFound => "AREA_NOT_FOUND",
            ErrorCode::UnknownTarget => "UNKNOWN_TARGET",
            ErrorCode::UnknownOrReplayedRequest => "UNKNOWN_OR_REPLAYED_REQUEST",
            ErrorCode::InvalidProof => "INVALID_PROOF",
            ErrorCode::MalformedPayload => "MALFORMED_PAYLOAD",
            ErrorCode::ScoreOutOfRange => "SCORE_OUT_OF_RANGE",
            ErrorCode::AlreadyRevealed => "ALREADY_REVEALED",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::MalformedBundle => "MALFORMED_BUNDLE",
            ErrorCode::OracleUnavailable => "ORACLE_UNAVAILABLE",
            ErrorCode::CiphertextBackendError => "CIPHERTEXT_BACKEND_ERROR",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Structured Error Response
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Numeric error code for easy categorization
    pub numeric_code: u32,

    /// Human-readable error message
    pub message: String,

    /// Oracle request id the error concerns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Entity reference such as `report/3`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                request_id: None,
                resource_id: None,
                details: None,
            },
        }
    }

    pub fn with_request_id(mut self, request_id: impl ToString) -> Self {
        self.error.request_id = Some(request_id.to_string());
        self
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.error.resource_id = Some(id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.error.code.as_str();
        let mut response = (status, Json(self)).into_response();

        response.headers_mut().insert(
            axum::http::header::HeaderName::from_static("x-error-code"),
            axum::http::HeaderValue::from_static(code),
        );
        response
    }
}

// ============================================================================
// Conversion from LedgerError
// ============================================================================

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();

        match err {
            LedgerError::UnknownTarget { purpose, target } => {
                ApiError::new(ErrorCode::UnknownTarget, message)
                    .with_resource_id(target)
                    .with_details(serde_json::json!({ "purpose": purpose.as_str() }))
            }
            LedgerError::UnknownOrReplayedRequest(request_id) => {
                ApiError::new(ErrorCode::UnknownOrReplayedRequest, message)
                    .with_request_id(request_id)
            }
            LedgerError::InvalidProof(request_id) => {
                ApiError::new(ErrorCode::InvalidProof, message).with_request_id(request_id)
            }
            LedgerError::MalformedPayload { request_id, reason } => {
                ApiError::new(ErrorCode::MalformedPayload, message)
                    .with_request_id(request_id)
                    .with_details(serde_json::json!({ "reason": reason }))
            }
            LedgerError::ScoreOutOfRange {
                request_id,
                field,
                value,
            } => ApiError::new(ErrorCode::ScoreOutOfRange, message)
                .with_request_id(request_id)
                .with_details(serde_json::json!({ "field": field, "value": value })),
            LedgerError::AlreadyRevealed(id) => ApiError::new(ErrorCode::AlreadyRevealed, message)
                .with_resource_id(format!("analysis/{id}")),
            LedgerError::UnknownAnalysis(id) => {
                ApiError::new(ErrorCode::AnalysisNotFound, message)
                    .with_resource_id(format!("analysis/{id}"))
            }
            LedgerError::UnknownReport(id) => ApiError::new(ErrorCode::ReportNotFound, message)
                .with_resource_id(format!("report/{id}")),
            LedgerError::InvalidStateTransition { entity, from, to } => {
                ApiError::new(ErrorCode::InvalidStateTransition, message)
                    .with_resource_id(entity)
                    .with_details(serde_json::json!({ "from_state": from, "to_state": to }))
            }
            LedgerError::MalformedBundle { .. } => {
                ApiError::new(ErrorCode::MalformedBundle, message)
            }
            LedgerError::OracleUnavailable(_) => {
                ApiError::new(ErrorCode::OracleUnavailable, message)
            }
            LedgerError::Ciphertext(CiphertextError::MalformedInput(_)) => {
                ApiError::new(ErrorCode::MalformedEncryptedInput, message)
            }
            LedgerError::Ciphertext(_) => {
                ApiError::new(ErrorCode::CiphertextBackendError, message)
            }
            LedgerError::Configuration(_) => {
                ApiError::new(ErrorCode::ConfigurationError, message)
            }
            LedgerError::Internal(_) => ApiError::new(ErrorCode::InternalError, message),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(ErrorCode::InvalidRequestBody, rejection.body_text())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

pub fn not_found(code: ErrorCode, resource: impl Into<String>) -> ApiError {
    let resource = resource.into();
    ApiError::new(code, format!("not found: {resource}")).with_resource_id(resource)
}

/// Create a validation error with field details
pub fn validation_error(field: &str, message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::InvalidFieldValue, message.into())
        .with_details(serde_json::json!({ "field": field }))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnalysisId, Purpose, RequestId};

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::UnknownTarget.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::UnknownOrReplayedRequest.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErrorCode::InvalidProof.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::OracleUnavailable.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_replay_maps_to_conflict_with_request_id() {
        let request_id = RequestId::new();
        let error = ApiError::from(LedgerError::UnknownOrReplayedRequest(request_id));

        assert_eq!(error.error.code, ErrorCode::UnknownOrReplayedRequest);
        assert_eq!(error.error.numeric_code, 3001);
        assert_eq!(error.error.request_id, Some(request_id.to_string()));
        assert_eq!(error.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_unknown_target_carries_resource() {
        let error = ApiError::from(LedgerError::UnknownTarget {
            purpose: Purpose::AnalysisReveal,
            target: "analysis/9".into(),
        });
        assert_eq!(error.error.resource_id.as_deref(), Some("analysis/9"));
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_malformed_input_is_client_error() {
        let error = ApiError::from(LedgerError::Ciphertext(CiphertextError::MalformedInput(
            "integrity tag mismatch".into(),
        )));
        assert_eq!(error.error.code, ErrorCode::MalformedEncryptedInput);
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);

        let error = ApiError::from(LedgerError::Ciphertext(CiphertextError::Backend(
            "offline".into(),
        )));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_serialization() {
        let error = ApiError::from(LedgerError::AlreadyRevealed(AnalysisId::new(2)));
        let json = serde_json::to_value(&error).unwrap();

        assert_eq!(json["error"]["code"], "ALREADY_REVEALED");
        assert_eq!(json["error"]["numeric_code"], 4001);
        assert_eq!(json["error"]["resource_id"], "analysis/2");
        assert!(json["error"].get("request_id").is_none());
    }

    #[test]
    fn test_response_sets_error_code_header() {
        let response = not_found(ErrorCode::AreaNotFound, "area/1").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-error-code"], "AREA_NOT_FOUND");
    }
}

//! Error types for SafePlate Risk Ledger infrastructure

use thiserror::Error;

use crate::crypto::PayloadError;
use crate::domain::{AnalysisId, Purpose, ReportId, RequestId};

/// Errors raised by a ciphertext store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CiphertextError {
    /// Client-submitted input the store does not recognize
    #[error("malformed encrypted input: {0}")]
    MalformedInput(String),

    /// Handle not issued by this store
    #[error("unknown ciphertext handle: {0}")]
    UnknownHandle(String),

    /// Store backend failure
    #[error("ciphertext backend error: {0}")]
    Backend(String),
}

/// Errors raised by a decryption oracle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Decryption could not be requested
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    /// Proof does not attest the given request and payload
    #[error("invalid decryption proof")]
    InvalidProof,

    /// Request id was never issued by this oracle
    #[error("unknown decryption request: {0}")]
    UnknownRequest(RequestId),
}

/// Errors that can occur in the ledger pipeline
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Dispatch referenced an entity that does not exist
    #[error("unknown target for {purpose}: {target}")]
    UnknownTarget { purpose: Purpose, target: String },

    /// Callback for a request that is not pending
    #[error("unknown or replayed request: {0}")]
    UnknownOrReplayedRequest(RequestId),

    /// Callback proof failed verification
    #[error("invalid proof for request {0}")]
    InvalidProof(RequestId),

    /// Callback payload does not match the purpose's schema
    #[error("malformed payload for request {request_id}: {reason}")]
    MalformedPayload {
        request_id: RequestId,
        reason: String,
    },

    /// Decrypted score outside 0..=100
    #[error("score out of range for request {request_id}: {field}={value}")]
    ScoreOutOfRange {
        request_id: RequestId,
        field: &'static str,
        value: u32,
    },

    /// Analysis was already revealed
    #[error("analysis already revealed: {0}")]
    AlreadyRevealed(AnalysisId),

    /// Analysis id is 0 or beyond the current count
    #[error("unknown analysis: {0}")]
    UnknownAnalysis(AnalysisId),

    /// Report id is 0 or beyond the current count
    #[error("unknown report: {0}")]
    UnknownReport(ReportId),

    /// Entity is not in the source state an operation requires
    #[error("invalid state transition for {entity}: {from} -> {to}")]
    InvalidStateTransition {
        entity: String,
        from: &'static str,
        to: &'static str,
    },

    /// Ciphertext bundle does not match the purpose's schema
    #[error("malformed bundle for {purpose}: expected {expected} ciphertexts, got {actual}")]
    MalformedBundle {
        purpose: Purpose,
        expected: usize,
        actual: usize,
    },

    /// The oracle could not accept a decryption request
    #[error("oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Ciphertext store error
    #[error("ciphertext error: {0}")]
    Ciphertext(#[from] CiphertextError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub(crate) fn malformed_payload(request_id: RequestId, error: PayloadError) -> Self {
        LedgerError::MalformedPayload {
            request_id,
            reason: error.to_string(),
        }
    }

    /// Whether this error rejected an inbound oracle callback.
    ///
    /// These paths leave every table unchanged.
    pub fn is_callback_rejection(&self) -> bool {
        matches!(
            self,
            LedgerError::UnknownOrReplayedRequest(_)
                | LedgerError::InvalidProof(_)
                | LedgerError::MalformedPayload { .. }
                | LedgerError::ScoreOutOfRange { .. }
        )
    }

    /// Stable label for metrics.
    pub fn metric_label(&self) -> &'static str {
        match self {
            LedgerError::UnknownTarget { .. } => "unknown_target",
            LedgerError::UnknownOrReplayedRequest(_) => "unknown_or_replayed_request",
            LedgerError::InvalidProof(_) => "invalid_proof",
            LedgerError::MalformedPayload { .. } => "malformed_payload",
            LedgerError::ScoreOutOfRange { .. } => "score_out_of_range",
            LedgerError::AlreadyRevealed(_) => "already_revealed",
            LedgerError::UnknownAnalysis(_) => "unknown_analysis",
            LedgerError::UnknownReport(_) => "unknown_report",
            LedgerError::InvalidStateTransition { .. } => "invalid_state_transition",
            LedgerError::MalformedBundle { .. } => "malformed_bundle",
            LedgerError::OracleUnavailable(_) => "oracle_unavailable",
            LedgerError::Ciphertext(_) => "ciphertext",
            LedgerError::Configuration(_) => "configuration",
            LedgerError::Internal(_) => "internal",
        }
    }
}

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

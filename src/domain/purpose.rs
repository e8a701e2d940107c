//! Decrypt-request purposes and their fixed cleartext schemas

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{bytes_hex_0x, signature64_hex_0x, AnalysisId, LocationCode, ReportId, RequestId};

/// Reason a decrypt request was issued.
///
/// Doubles as the callback selector handed to the oracle: the purpose fixes
/// both the cleartext schema and the transition applied on resolution.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde_repr::Serialize_repr,
    serde_repr::Deserialize_repr,
)]
#[repr(u8)]
pub enum Purpose {
    RiskCalculation = 1,
    AnalysisReveal = 2,
    AreaStatsReveal = 3,
}

impl Purpose {
    /// Ordered slot names of the ciphertext bundle and cleartext payload.
    pub fn schema(&self) -> &'static [&'static str] {
        match self {
            Purpose::RiskCalculation => &["hygiene", "food_safety", "facility", "location_code"],
            Purpose::AnalysisReveal => &["risk_score", "priority_level"],
            Purpose::AreaStatsReveal => &["hygiene_sum", "high_risk_count"],
        }
    }

    /// Number of values in this purpose's schema.
    pub fn arity(&self) -> usize {
        self.schema().len()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::RiskCalculation => "risk_calculation",
            Purpose::AnalysisReveal => "analysis_reveal",
            Purpose::AreaStatsReveal => "area_stats_reveal",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of a decrypt request, typed by purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "purpose", rename_all = "snake_case")]
pub enum DecryptTarget {
    RiskCalculation { report_id: ReportId },
    AnalysisReveal { analysis_id: AnalysisId },
    AreaStatsReveal { location: LocationCode },
}

impl DecryptTarget {
    pub fn purpose(&self) -> Purpose {
        match self {
            DecryptTarget::RiskCalculation { .. } => Purpose::RiskCalculation,
            DecryptTarget::AnalysisReveal { .. } => Purpose::AnalysisReveal,
            DecryptTarget::AreaStatsReveal { .. } => Purpose::AreaStatsReveal,
        }
    }

    /// Human-readable target reference for errors and logs.
    pub fn describe(&self) -> String {
        match self {
            DecryptTarget::RiskCalculation { report_id } => format!("report/{report_id}"),
            DecryptTarget::AnalysisReveal { analysis_id } => format!("analysis/{analysis_id}"),
            DecryptTarget::AreaStatsReveal { location } => format!("area/{location}"),
        }
    }
}

/// A dispatched decrypt request awaiting its oracle callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRequest {
    pub request_id: RequestId,
    pub target: DecryptTarget,
    pub dispatched_at: DateTime<Utc>,
}

impl PendingRequest {
    pub fn new(request_id: RequestId, target: DecryptTarget) -> Self {
        Self {
            request_id,
            target,
            dispatched_at: Utc::now(),
        }
    }

    pub fn purpose(&self) -> Purpose {
        self.target.purpose()
    }
}

/// Oracle callback delivering the cleartext of a decrypt request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionCallback {
    pub request_id: RequestId,
    /// Raw payload exactly as signed by the oracle
    #[serde(with = "bytes_hex_0x")]
    pub cleartexts: Vec<u8>,
    #[serde(with = "signature64_hex_0x")]
    pub proof: [u8; 64],
}

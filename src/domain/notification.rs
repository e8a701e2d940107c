//! Observable notifications emitted by the ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AnalysisId, ReportId};

/// Ledger notification, published in order of occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "PascalCase")]
pub enum Notification {
    ReportSubmitted {
        report_id: ReportId,
        timestamp: DateTime<Utc>,
    },
    AnalysisRequested {
        report_id: ReportId,
    },
    RiskIdentified {
        analysis_id: AnalysisId,
    },
    AnalysisRevealed {
        analysis_id: AnalysisId,
    },
}

impl Notification {
    pub fn name(&self) -> &'static str {
        match self {
            Notification::ReportSubmitted { .. } => "ReportSubmitted",
            Notification::AnalysisRequested { .. } => "AnalysisRequested",
            Notification::RiskIdentified { .. } => "RiskIdentified",
            Notification::AnalysisRevealed { .. } => "AnalysisRevealed",
        }
    }
}

/// A notification with its position in the ledger's notification stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub sequence: u64,
    #[serde(flatten)]
    pub notification: Notification,
}

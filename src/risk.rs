//! Risk & aggregation engine
//!
//! Pure arithmetic over decrypted inspection scores. Nothing here touches
//! storage or the oracle; the resolver feeds it cleartext and encrypts what
//! it returns.

use serde::{Deserialize, Serialize};

use crate::domain::MAX_SCORE;

/// Risk score above which an analysis is high risk.
pub const HIGH_RISK_THRESHOLD: u32 = 100;

/// Risk score above which an analysis is critical.
pub const CRITICAL_RISK_THRESHOLD: u32 = 150;

/// Decrypted inspection scores, each in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionScores {
    pub hygiene: u32,
    pub food_safety: u32,
    pub facility: u32,
}

/// Derived classification of one set of scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: u32,
    pub priority_level: u32,
    pub high_risk: bool,
}

/// A score that falls outside `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange {
    pub field: &'static str,
    pub value: u32,
}

impl InspectionScores {
    /// Build from decrypted values, rejecting any score above 100.
    pub fn new(hygiene: u32, food_safety: u32, facility: u32) -> Result<Self, OutOfRange> {
        validate_score("hygiene", hygiene)?;
        validate_score("food_safety", food_safety)?;
        validate_score("facility", facility)?;
        Ok(Self {
            hygiene,
            food_safety,
            facility,
        })
    }
}

/// Check a single score against the inclusive `0..=100` range.
pub fn validate_score(field: &'static str, value: u32) -> Result<u32, OutOfRange> {
    if value > MAX_SCORE {
        return Err(OutOfRange { field, value });
    }
    Ok(value)
}

/// Sum of each score's shortfall from 100.
pub fn risk_score(scores: &InspectionScores) -> u32 {
    (MAX_SCORE - scores.hygiene) + (MAX_SCORE - scores.food_safety) + (MAX_SCORE - scores.facility)
}

/// 3 above 150, 2 above 100, otherwise 1.
pub fn priority_level(risk_score: u32) -> u32 {
    if risk_score > CRITICAL_RISK_THRESHOLD {
        3
    } else if risk_score > HIGH_RISK_THRESHOLD {
        2
    } else {
        1
    }
}

pub fn is_high_risk(risk_score: u32) -> bool {
    risk_score > HIGH_RISK_THRESHOLD
}

/// Increment applied to an area's high-risk count for this score.
pub fn high_risk_delta(risk_score: u32) -> u32 {
    u32::from(is_high_risk(risk_score))
}

pub fn assess(scores: &InspectionScores) -> RiskAssessment {
    let risk_score = risk_score(scores);
    RiskAssessment {
        risk_score,
        priority_level: priority_level(risk_score),
        high_risk: is_high_risk(risk_score),
    }
}

/// Whether a value is a priority level this engine can produce.
pub fn is_valid_priority(level: u32) -> bool {
    (1..=3).contains(&level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_inspection_is_low_priority() {
        let scores = InspectionScores::new(90, 85, 80).unwrap();
        let assessment = assess(&scores);
        assert_eq!(assessment.risk_score, 45);
        assert_eq!(assessment.priority_level, 1);
        assert!(!assessment.high_risk);
    }

    #[test]
    fn test_failing_inspection_is_critical() {
        let scores = InspectionScores::new(40, 30, 20).unwrap();
        let assessment = assess(&scores);
        assert_eq!(assessment.risk_score, 210);
        assert_eq!(assessment.priority_level, 3);
        assert!(assessment.high_risk);
    }

    #[test]
    fn test_priority_boundaries() {
        assert_eq!(priority_level(0), 1);
        assert_eq!(priority_level(100), 1);
        assert_eq!(priority_level(101), 2);
        assert_eq!(priority_level(150), 2);
        assert_eq!(priority_level(151), 3);
        assert_eq!(priority_level(300), 3);
    }

    #[test]
    fn test_high_risk_delta() {
        assert_eq!(high_risk_delta(100), 0);
        assert_eq!(high_risk_delta(101), 1);
    }

    #[test]
    fn test_extremes() {
        let perfect = InspectionScores::new(100, 100, 100).unwrap();
        assert_eq!(risk_score(&perfect), 0);

        let worst = InspectionScores::new(0, 0, 0).unwrap();
        assert_eq!(risk_score(&worst), 300);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = InspectionScores::new(90, 101, 80).unwrap_err();
        assert_eq!(err.field, "food_safety");
        assert_eq!(err.value, 101);
        assert!(validate_score("hygiene", u32::MAX).is_err());
    }

    #[test]
    fn test_valid_priority() {
        assert!(!is_valid_priority(0));
        assert!(is_valid_priority(1));
        assert!(is_valid_priority(3));
        assert!(!is_valid_priority(4));
    }
}

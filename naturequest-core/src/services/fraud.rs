// src/services/fraud.rs
//
// Pure fraud scoring. The verification service gathers the signals from
// the attempt history; this module turns them into a score, a risk level
// and the factor list persisted with the check.

use naturequest_common::models::RiskLevel;

pub const DUPLICATE_PHOTO_WEIGHT: f64 = 0.4;
pub const RAPID_SUBMISSION_WEIGHT: f64 = 0.3;
pub const SUSPICIOUS_LOCATION_WEIGHT: f64 = 0.3;

pub const RAPID_SUBMISSION_LIMIT: i64 = 5;
pub const SAME_LOCATION_LIMIT: i64 = 3;
pub const MAX_PLAUSIBLE_SPEED_KMH: f64 = 100.0;

const MEDIUM_RISK: f64 = 0.3;
const HIGH_RISK: f64 = 0.6;
const CRITICAL_RISK: f64 = 0.8;

/// Raw facts about the attempt, gathered before scoring.
#[derive(Debug, Clone, Copy, Default)]
pub struct FraudSignals {
    pub duplicate_photo: bool,
    /// Submissions by the user in the trailing hour, this one included.
    pub submissions_last_hour: i64,
    /// Prior attempts from exactly the same coordinates.
    pub same_location_attempts: i64,
    /// Implied travel speed from the previous attempt, when there is one.
    pub travel_speed_kmh: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FraudAssessment {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
    pub duplicate_photo_detected: bool,
    pub rapid_submissions: bool,
    pub suspicious_location: bool,
    pub requires_manual_review: bool,
}

pub fn assess(signals: &FraudSignals) -> FraudAssessment {
    let mut score = 0.0;
    let mut factors = Vec::new();

    if signals.duplicate_photo {
        score += DUPLICATE_PHOTO_WEIGHT;
        factors.push("duplicate_photo".to_string());
    }

    let rapid = signals.submissions_last_hour > RAPID_SUBMISSION_LIMIT;
    if rapid {
        score += RAPID_SUBMISSION_WEIGHT;
        factors.push(format!(
            "rapid_submissions:{}_in_last_hour",
            signals.submissions_last_hour
        ));
    }

    let mut suspicious = false;
    if signals.same_location_attempts > SAME_LOCATION_LIMIT {
        suspicious = true;
        factors.push(format!(
            "repeated_exact_coordinates:{}",
            signals.same_location_attempts
        ));
    }
    if let Some(speed) = signals.travel_speed_kmh {
        if speed > MAX_PLAUSIBLE_SPEED_KMH {
            suspicious = true;
            factors.push(format!("implausible_travel_speed:{:.0}kmh", speed));
        }
    }
    if suspicious {
        score += SUSPICIOUS_LOCATION_WEIGHT;
    }

    let risk_level = if score >= CRITICAL_RISK {
        RiskLevel::Critical
    } else if score >= HIGH_RISK {
        RiskLevel::High
    } else if score >= MEDIUM_RISK {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    FraudAssessment {
        risk_score: score,
        risk_level,
        risk_factors: factors,
        duplicate_photo_detected: signals.duplicate_photo,
        rapid_submissions: rapid,
        suspicious_location: suspicious,
        requires_manual_review: score >= HIGH_RISK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_attempt_scores_low() {
        let a = assess(&FraudSignals {
            submissions_last_hour: 1,
            ..Default::default()
        });
        assert_eq!(a.risk_score, 0.0);
        assert_eq!(a.risk_level, RiskLevel::Low);
        assert!(!a.requires_manual_review);
        assert!(a.risk_factors.is_empty());
    }

    #[test]
    fn duplicate_photo_alone_is_medium() {
        let a = assess(&FraudSignals {
            duplicate_photo: true,
            submissions_last_hour: 1,
            ..Default::default()
        });
        assert!((a.risk_score - 0.4).abs() < 1e-9);
        assert_eq!(a.risk_level, RiskLevel::Medium);
        assert!(!a.requires_manual_review);
    }

    #[test]
    fn duplicate_plus_rapid_requires_review() {
        let a = assess(&FraudSignals {
            duplicate_photo: true,
            submissions_last_hour: 6,
            ..Default::default()
        });
        assert!((a.risk_score - 0.7).abs() < 1e-9);
        assert_eq!(a.risk_level, RiskLevel::High);
        assert!(a.requires_manual_review);
    }

    #[test]
    fn all_signals_are_critical() {
        let a = assess(&FraudSignals {
            duplicate_photo: true,
            submissions_last_hour: 10,
            same_location_attempts: 4,
            travel_speed_kmh: Some(500.0),
        });
        assert!((a.risk_score - 1.0).abs() < 1e-9);
        assert_eq!(a.risk_level, RiskLevel::Critical);
        assert!(a.requires_manual_review);
    }

    #[test]
    fn location_signals_share_one_weight() {
        // Both coordinate reuse and speed fire, but the weight applies once.
        let a = assess(&FraudSignals {
            submissions_last_hour: 1,
            same_location_attempts: 5,
            travel_speed_kmh: Some(300.0),
            ..Default::default()
        });
        assert!((a.risk_score - 0.3).abs() < 1e-9);
        assert_eq!(a.risk_factors.len(), 2);
        assert!(a.suspicious_location);
    }

    #[test]
    fn exactly_five_submissions_is_not_rapid() {
        let a = assess(&FraudSignals {
            submissions_last_hour: 5,
            ..Default::default()
        });
        assert!(!a.rapid_submissions);
    }

    #[test]
    fn plausible_speed_is_fine() {
        let a = assess(&FraudSignals {
            submissions_last_hour: 1,
            travel_speed_kmh: Some(60.0),
            ..Default::default()
        });
        assert!(!a.suspicious_location);
    }
}

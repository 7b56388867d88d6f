// naturequest-common/src/models/challenge.rs
//
// Location-tied challenges and the verification records produced when a
// user submits an attempt.

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChallengeDifficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for ChallengeDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChallengeDifficulty::Beginner => write!(f, "beginner"),
            ChallengeDifficulty::Intermediate => write!(f, "intermediate"),
            ChallengeDifficulty::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for ChallengeDifficulty {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(ChallengeDifficulty::Beginner),
            "intermediate" => Ok(ChallengeDifficulty::Intermediate),
            "advanced" => Ok(ChallengeDifficulty::Advanced),
            _ => Err(format!("Unknown challenge difficulty: {}", s)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Park,
    Forest,
    Lake,
    Mountain,
    Beach,
    Garden,
    Trail,
    WildlifeArea,
    NatureReserve,
    River,
    Waterfall,
    Desert,
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LocationType::Park => "park",
            LocationType::Forest => "forest",
            LocationType::Lake => "lake",
            LocationType::Mountain => "mountain",
            LocationType::Beach => "beach",
            LocationType::Garden => "garden",
            LocationType::Trail => "trail",
            LocationType::WildlifeArea => "wildlife_area",
            LocationType::NatureReserve => "nature_reserve",
            LocationType::River => "river",
            LocationType::Waterfall => "waterfall",
            LocationType::Desert => "desert",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for LocationType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "park" => Ok(LocationType::Park),
            "forest" => Ok(LocationType::Forest),
            "lake" => Ok(LocationType::Lake),
            "mountain" => Ok(LocationType::Mountain),
            "beach" => Ok(LocationType::Beach),
            "garden" => Ok(LocationType::Garden),
            "trail" => Ok(LocationType::Trail),
            "wildlife_area" => Ok(LocationType::WildlifeArea),
            "nature_reserve" => Ok(LocationType::NatureReserve),
            "river" => Ok(LocationType::River),
            "waterfall" => Ok(LocationType::Waterfall),
            "desert" => Ok(LocationType::Desert),
            _ => Err(format!("Unknown location type: {}", s)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Challenge {
    pub challenge_id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: ChallengeDifficulty,
    pub location_type: LocationType,
    pub location_name: String,
    pub target_latitude: f64,
    pub target_longitude: f64,
    pub verification_radius_m: i32,
    pub required_elements: Vec<String>,
    pub special_instructions: String,
    pub points_reward: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Pending,
    Verified,
    Failed,
    Rejected,
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::Pending => write!(f, "pending"),
            AttemptStatus::Verified => write!(f, "verified"),
            AttemptStatus::Failed => write!(f, "failed"),
            AttemptStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for AttemptStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(AttemptStatus::Pending),
            "verified" => Ok(AttemptStatus::Verified),
            "failed" => Ok(AttemptStatus::Failed),
            "rejected" => Ok(AttemptStatus::Rejected),
            _ => Err(format!("Unknown attempt status: {}", s)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChallengeAttempt {
    pub attempt_id: Uuid,
    pub user_id: Uuid,
    pub challenge_id: Uuid,
    pub status: AttemptStatus,
    pub photo_url: String,
    pub photo_digest: String,
    pub submitted_latitude: f64,
    pub submitted_longitude: f64,
    pub submission_notes: String,
    pub location_verified: bool,
    pub verification_details: Value,
    pub points_earned: i32,
    pub bonus_points: i32,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl ChallengeAttempt {
    pub fn is_verified(&self) -> bool {
        self.status == AttemptStatus::Verified
    }

    pub fn total_points(&self) -> i32 {
        self.points_earned + self.bonus_points
    }
}

/// What a client sends when attempting a challenge. The photo itself is
/// uploaded out of band; we receive its URL and SHA-256 digest.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AttemptSubmission {
    pub challenge_id: Uuid,
    pub photo_url: String,
    pub photo_digest: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LocationVerification {
    pub verification_id: Uuid,
    pub attempt_id: Uuid,
    pub is_valid_coordinate: bool,
    pub distance_to_target_m: Option<f64>,
    pub location_type_match: bool,
    pub nearby_places: Value,
    pub verification_confidence: f64,
    pub verification_passed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            _ => Err(format!("Unknown risk level: {}", s)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FraudCheck {
    pub check_id: Uuid,
    pub attempt_id: Uuid,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub risk_factors: Vec<String>,
    pub duplicate_photo_detected: bool,
    pub rapid_submissions: bool,
    pub suspicious_location: bool,
    pub requires_manual_review: bool,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewer: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct VerificationMetrics {
    pub challenge_id: Uuid,
    pub total_attempts: i32,
    pub successful_verifications: i32,
    pub failed_verifications: i32,
    pub average_verification_time: f64,
    pub photo_failures: i32,
    pub location_failures: i32,
    pub last_updated: DateTime<Utc>,
}

impl VerificationMetrics {
    pub fn success_rate(&self) -> f64 {
        if self.total_attempts > 0 {
            f64::from(self.successful_verifications) / f64::from(self.total_attempts) * 100.0
        } else {
            0.0
        }
    }
}

/// Per-challenge roll-up for the my_progress endpoint.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChallengeProgress {
    pub challenge: Challenge,
    pub attempts: Vec<ChallengeAttempt>,
    pub best_attempt: Option<ChallengeAttempt>,
    pub is_completed: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChallengeProgressReport {
    pub progress: Vec<ChallengeProgress>,
    pub total_challenges: i64,
    pub completed_challenges: i64,
}

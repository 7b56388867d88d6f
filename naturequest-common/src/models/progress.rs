// naturequest-common/src/models/progress.rs
//
// Gamification ledger types: levels, badges, profiles, and the
// append-only points transaction log.

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::quiz::QuizDifficulty;

/// One of the 12 gemstone levels, ordered by `level_number`.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Level {
    pub level_number: i32,
    pub name: String,
    pub points_required: i32,
    pub description: String,
}

/// One of the 13 animal badges (12 zodiac + the special Cat badge).
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Badge {
    pub badge_id: i32,
    pub animal: String,
    pub name: String,
    pub description: String,
    pub points_required: i32,
    pub is_special: bool,
    pub icon_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub is_techie: bool,
    pub tech_stacks: String,
    pub total_points: i32,
    pub current_level: Option<i32>,
    pub challenges_completed: i32,
    pub quizzes_completed: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            is_techie: false,
            tech_stacks: String::new(),
            total_points: 0,
            current_level: None,
            challenges_completed: 0,
            quizzes_completed: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Quiz difficulty scales with the number of verified challenges.
    pub fn quiz_difficulty(&self) -> QuizDifficulty {
        if self.challenges_completed <= 8 {
            QuizDifficulty::Easy
        } else if self.challenges_completed <= 16 {
            QuizDifficulty::Medium
        } else {
            QuizDifficulty::Hard
        }
    }

    /// Tech stacks are stored as a comma-separated list.
    pub fn tech_stack_list(&self) -> Vec<String> {
        self.tech_stacks
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct UserBadge {
    pub user_badge_id: Uuid,
    pub user_id: Uuid,
    pub badge_id: i32,
    pub earned_at: DateTime<Utc>,
    pub points_when_earned: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    ChallengeCompletion,
    QuizCompletion,
    BadgeEarned,
    LevelUp,
    SpecialEvent,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::ChallengeCompletion => write!(f, "challenge_completion"),
            TransactionType::QuizCompletion => write!(f, "quiz_completion"),
            TransactionType::BadgeEarned => write!(f, "badge_earned"),
            TransactionType::LevelUp => write!(f, "level_up"),
            TransactionType::SpecialEvent => write!(f, "special_event"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "challenge_completion" => Ok(TransactionType::ChallengeCompletion),
            "quiz_completion" => Ok(TransactionType::QuizCompletion),
            "badge_earned" => Ok(TransactionType::BadgeEarned),
            "level_up" => Ok(TransactionType::LevelUp),
            "special_event" => Ok(TransactionType::SpecialEvent),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

/// Append-only ledger row. `total_points` on the profile is always the
/// sum of these rows for the user.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct PointsTransaction {
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub points: i32,
    pub description: String,
    pub challenge_id: Option<Uuid>,
    pub quiz_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl PointsTransaction {
    pub fn new(
        user_id: Uuid,
        transaction_type: TransactionType,
        points: i32,
        description: &str,
    ) -> Self {
        Self {
            transaction_id: Uuid::new_v4(),
            user_id,
            transaction_type,
            points,
            description: description.to_string(),
            challenge_id: None,
            quiz_id: None,
            created_at: Utc::now(),
        }
    }
}

/// Request payload for a progress update.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProgressUpdate {
    pub user_id: Uuid,
    pub points: i32,
    pub transaction_type: TransactionType,
    pub description: String,
    #[serde(default)]
    pub challenge_id: Option<Uuid>,
    #[serde(default)]
    pub quiz_id: Option<Uuid>,
    #[serde(default)]
    pub increment_challenges: bool,
    #[serde(default)]
    pub increment_quizzes: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AchievementSummary {
    pub new_badges: Vec<EarnedBadge>,
    pub new_level: Option<LevelUp>,
    pub bonus_points: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EarnedBadge {
    pub animal: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LevelUp {
    pub level_number: i32,
    pub name: String,
    pub description: String,
    pub bonus_points: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProgressOutcome {
    pub new_total_points: i32,
    pub achievements: AchievementSummary,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub username: String,
    pub total_points: i32,
    pub level_name: Option<String>,
    pub challenges_completed: i32,
    pub quizzes_completed: i32,
}

/// Bundle returned by the stats endpoint.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserStats {
    pub profile: UserProfile,
    pub badges: Vec<(UserBadge, Badge)>,
    pub recent_transactions: Vec<PointsTransaction>,
    pub next_badge: Option<Badge>,
    pub next_level: Option<Level>,
}

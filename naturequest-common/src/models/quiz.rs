// naturequest-common/src/models/quiz.rs

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
pub enum QuizDifficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for QuizDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizDifficulty::Easy => write!(f, "easy"),
            QuizDifficulty::Medium => write!(f, "medium"),
            QuizDifficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for QuizDifficulty {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(QuizDifficulty::Easy),
            "medium" => Ok(QuizDifficulty::Medium),
            "hard" => Ok(QuizDifficulty::Hard),
            _ => Err(format!("Unknown quiz difficulty: {}", s)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Exactly one correct answer.
    MultipleChoice,
    /// One or more correct answers; all must be selected.
    Checkbox,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::MultipleChoice => write!(f, "multiple_choice"),
            QuestionType::Checkbox => write!(f, "checkbox"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "checkbox" => Ok(QuestionType::Checkbox),
            _ => Err(format!("Unknown question type: {}", s)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Quiz {
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub challenge_id: Uuid,
    pub tech_stack: String,
    pub difficulty: QuizDifficulty,
    pub total_questions: i32,
    pub pass_threshold: f64,
    pub score: Option<f64>,
    pub passed: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Quiz {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Question {
    pub question_id: Uuid,
    pub quiz_id: Uuid,
    pub position: i32,
    pub question_type: QuestionType,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answers: Vec<usize>,
    pub explanation: String,
    pub points: i32,
}

/// Question drawn from a provider, not yet attached to a quiz.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewQuestion {
    pub question_type: QuestionType,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answers: Vec<usize>,
    pub explanation: String,
    pub points: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct QuizAttempt {
    pub attempt_id: Uuid,
    pub quiz_id: Uuid,
    pub total_score: Option<f64>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl QuizAttempt {
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuestionResponse {
    pub response_id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub selected_answers: Vec<usize>,
    pub is_correct: bool,
    pub points_earned: i32,
}

/// One answer in a quiz submission.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResponseInput {
    pub question_id: Uuid,
    pub selected_answers: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuizSubmitOutcome {
    pub score: f64,
    pub passed: bool,
    pub earned_points: i32,
    pub total_points: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuestionBankEntry {
    pub entry_id: Uuid,
    pub tech_stack: String,
    pub difficulty: QuizDifficulty,
    pub question_type: QuestionType,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answers: Vec<usize>,
    pub explanation: String,
    pub is_active: bool,
    pub times_used: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct QuizMetrics {
    pub tech_stack: String,
    pub difficulty: QuizDifficulty,
    pub total_quizzes: i32,
    pub total_passes: i32,
    pub average_score: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct QuizUserStats {
    pub total_quizzes_taken: i64,
    pub quizzes_passed: i64,
    pub overall_pass_rate: f64,
    pub average_score: f64,
    pub favorite_tech_stack: Option<String>,
    pub recent_quizzes: Vec<Quiz>,
}

/// Helpers for moving answer-index arrays through JSONB columns.
pub fn answers_to_json(answers: &[usize]) -> Value {
    Value::Array(answers.iter().map(|&i| Value::from(i as u64)).collect())
}

pub fn answers_from_json(value: &Value) -> Vec<usize> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_u64().map(|n| n as usize))
                .collect()
        })
        .unwrap_or_default()
}

pub fn options_to_json(options: &[String]) -> Value {
    Value::Array(options.iter().map(|o| Value::from(o.as_str())).collect())
}

pub fn options_from_json(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

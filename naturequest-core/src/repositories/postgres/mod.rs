// src/repositories/postgres/mod.rs

pub mod user;
pub mod auth_token;
pub mod profile;
pub mod points;
pub mod badge;
pub mod level;
pub mod quiz;
pub mod question_bank;
pub mod quiz_metrics;
pub mod challenge;
pub mod challenge_attempt;
pub mod verification;

pub use user::{UserRepo, UserRepository};
pub use auth_token::{AuthTokenRepo, PostgresAuthTokenRepository};
pub use profile::{ProfileRepo, PostgresProfileRepository};
pub use points::{PointsRepo, PostgresPointsRepository};
pub use badge::{BadgeRepo, PostgresBadgeRepository};
pub use level::{LevelRepo, PostgresLevelRepository};
pub use quiz::{QuizRepo, PostgresQuizRepository};
pub use question_bank::{QuestionBankRepo, PostgresQuestionBankRepository};
pub use quiz_metrics::{QuizMetricsRepo, PostgresQuizMetricsRepository};
pub use challenge::{ChallengeRepo, PostgresChallengeRepository};
pub use challenge_attempt::{ChallengeAttemptRepo, PostgresChallengeAttemptRepository};
pub use verification::{FailureClass, VerificationRepo, PostgresVerificationRepository};

// src/repositories/postgres/quiz_metrics.rs

use naturequest_common::models::{QuizDifficulty, QuizMetrics};
use crate::Error;
use sqlx::{Pool, Postgres};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait QuizMetricsRepo: Send + Sync {
    /// Fold one completed quiz into the (tech_stack, difficulty) bucket,
    /// keeping the running average in step.
    async fn record_result(
        &self,
        tech_stack: &str,
        difficulty: QuizDifficulty,
        score: f64,
        passed: bool,
    ) -> Result<(), Error>;
    async fn get(
        &self,
        tech_stack: &str,
        difficulty: QuizDifficulty,
    ) -> Result<Option<QuizMetrics>, Error>;
}

pub struct PostgresQuizMetricsRepository {
    pool: Pool<Postgres>,
}

impl PostgresQuizMetricsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QuizMetricsRepo for PostgresQuizMetricsRepository {
    async fn record_result(
        &self,
        tech_stack: &str,
        difficulty: QuizDifficulty,
        score: f64,
        passed: bool,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO quiz_metrics (tech_stack, difficulty, total_quizzes, total_passes, average_score)
            VALUES ($1, $2, 1, CASE WHEN $3 THEN 1 ELSE 0 END, $4)
            ON CONFLICT (tech_stack, difficulty)
            DO UPDATE SET
                total_quizzes = quiz_metrics.total_quizzes + 1,
                total_passes  = quiz_metrics.total_passes + CASE WHEN $3 THEN 1 ELSE 0 END,
                average_score = (quiz_metrics.average_score * quiz_metrics.total_quizzes + $4)
                                / (quiz_metrics.total_quizzes + 1)
            "#,
        )
        .bind(tech_stack)
        .bind(difficulty)
        .bind(passed)
        .bind(score)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(
        &self,
        tech_stack: &str,
        difficulty: QuizDifficulty,
    ) -> Result<Option<QuizMetrics>, Error> {
        let row = sqlx::query_as::<_, QuizMetrics>(
            r#"
            SELECT tech_stack, difficulty, total_quizzes, total_passes, average_score
            FROM quiz_metrics
            WHERE tech_stack = $1 AND difficulty = $2
            "#,
        )
        .bind(tech_stack)
        .bind(difficulty)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

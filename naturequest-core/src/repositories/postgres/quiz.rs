// src/repositories/postgres/quiz.rs

use naturequest_common::models::{
    answers_from_json, answers_to_json, options_from_json, options_to_json, Question,
    QuestionResponse, Quiz, QuizAttempt,
};
use crate::Error;
use serde_json::Value;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait QuizRepo: Send + Sync {
    /// Persist a quiz together with its questions and an open attempt.
    async fn create_with_questions(
        &self,
        quiz: &Quiz,
        questions: &[Question],
    ) -> Result<QuizAttempt, Error>;
    async fn find_for_user_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Option<Quiz>, Error>;
    async fn get(&self, quiz_id: Uuid) -> Result<Option<Quiz>, Error>;
    async fn questions_for(&self, quiz_id: Uuid) -> Result<Vec<Question>, Error>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Quiz>, Error>;
    async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<Quiz>, Error>;
    async fn completed_for_user(&self, user_id: Uuid) -> Result<Vec<Quiz>, Error>;
    async fn attempt_for(&self, quiz_id: Uuid) -> Result<Option<QuizAttempt>, Error>;
    /// Stamp the scored quiz and attempt, recording each response.
    async fn record_submission(
        &self,
        quiz: &Quiz,
        attempt: &QuizAttempt,
        responses: &[QuestionResponse],
    ) -> Result<(), Error>;
}

pub struct PostgresQuizRepository {
    pool: Pool<Postgres>,
}

impl PostgresQuizRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn question_from_row(r: &sqlx::postgres::PgRow) -> Result<Question, Error> {
    let options: Value = r.try_get("options")?;
    let correct: Value = r.try_get("correct_answers")?;
    Ok(Question {
        question_id: r.try_get("question_id")?,
        quiz_id: r.try_get("quiz_id")?,
        position: r.try_get("position")?,
        question_type: r.try_get("question_type")?,
        question_text: r.try_get("question_text")?,
        options: options_from_json(&options),
        correct_answers: answers_from_json(&correct),
        explanation: r.try_get("explanation")?,
        points: r.try_get("points")?,
    })
}

const QUIZ_COLUMNS: &str = r#"
    quiz_id, user_id, challenge_id, tech_stack, difficulty, total_questions,
    pass_threshold, score, passed, created_at, completed_at
"#;

#[async_trait::async_trait]
impl QuizRepo for PostgresQuizRepository {
    async fn create_with_questions(
        &self,
        quiz: &Quiz,
        questions: &[Question],
    ) -> Result<QuizAttempt, Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO quizzes (
                quiz_id, user_id, challenge_id, tech_stack, difficulty,
                total_questions, pass_threshold, score, passed, created_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(quiz.quiz_id)
        .bind(quiz.user_id)
        .bind(quiz.challenge_id)
        .bind(&quiz.tech_stack)
        .bind(quiz.difficulty)
        .bind(quiz.total_questions)
        .bind(quiz.pass_threshold)
        .bind(quiz.score)
        .bind(quiz.passed)
        .bind(quiz.created_at)
        .bind(quiz.completed_at)
        .execute(&mut *tx)
        .await?;

        for question in questions {
            sqlx::query(
                r#"
                INSERT INTO quiz_questions (
                    question_id, quiz_id, position, question_type, question_text,
                    options, correct_answers, explanation, points
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(question.question_id)
            .bind(question.quiz_id)
            .bind(question.position)
            .bind(question.question_type)
            .bind(&question.question_text)
            .bind(options_to_json(&question.options))
            .bind(answers_to_json(&question.correct_answers))
            .bind(&question.explanation)
            .bind(question.points)
            .execute(&mut *tx)
            .await?;
        }

        let attempt = QuizAttempt {
            attempt_id: Uuid::new_v4(),
            quiz_id: quiz.quiz_id,
            total_score: None,
            submitted_at: None,
        };
        sqlx::query(
            r#"
            INSERT INTO quiz_attempts (attempt_id, quiz_id, total_score, submitted_at)
            VALUES ($1, $2, NULL, NULL)
            "#,
        )
        .bind(attempt.attempt_id)
        .bind(attempt.quiz_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(attempt)
    }

    async fn find_for_user_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Option<Quiz>, Error> {
        let sql = format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE user_id = $1 AND challenge_id = $2"
        );
        let row = sqlx::query_as::<_, Quiz>(&sql)
            .bind(user_id)
            .bind(challenge_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get(&self, quiz_id: Uuid) -> Result<Option<Quiz>, Error> {
        let sql = format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE quiz_id = $1");
        let row = sqlx::query_as::<_, Quiz>(&sql)
            .bind(quiz_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn questions_for(&self, quiz_id: Uuid) -> Result<Vec<Question>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT question_id, quiz_id, position, question_type, question_text,
                   options, correct_answers, explanation, points
            FROM quiz_questions
            WHERE quiz_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(question_from_row).collect()
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Quiz>, Error> {
        let sql = format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, Quiz>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<Quiz>, Error> {
        let sql = format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, Quiz>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn completed_for_user(&self, user_id: Uuid) -> Result<Vec<Quiz>, Error> {
        let sql = format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE user_id = $1 AND completed_at IS NOT NULL ORDER BY completed_at DESC"
        );
        let rows = sqlx::query_as::<_, Quiz>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn attempt_for(&self, quiz_id: Uuid) -> Result<Option<QuizAttempt>, Error> {
        let row = sqlx::query_as::<_, QuizAttempt>(
            r#"
            SELECT attempt_id, quiz_id, total_score, submitted_at
            FROM quiz_attempts
            WHERE quiz_id = $1
            "#,
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn record_submission(
        &self,
        quiz: &Quiz,
        attempt: &QuizAttempt,
        responses: &[QuestionResponse],
    ) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE quizzes
            SET score = $1, passed = $2, completed_at = $3
            WHERE quiz_id = $4
            "#,
        )
        .bind(quiz.score)
        .bind(quiz.passed)
        .bind(quiz.completed_at)
        .bind(quiz.quiz_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE quiz_attempts
            SET total_score = $1, submitted_at = $2
            WHERE attempt_id = $3
            "#,
        )
        .bind(attempt.total_score)
        .bind(attempt.submitted_at)
        .bind(attempt.attempt_id)
        .execute(&mut *tx)
        .await?;

        for response in responses {
            sqlx::query(
                r#"
                INSERT INTO question_responses (
                    response_id, attempt_id, question_id, selected_answers,
                    is_correct, points_earned
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(response.response_id)
            .bind(response.attempt_id)
            .bind(response.question_id)
            .bind(answers_to_json(&response.selected_answers))
            .bind(response.is_correct)
            .bind(response.points_earned)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

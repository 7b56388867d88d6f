// src/repositories/postgres/question_bank.rs

use naturequest_common::models::{
    answers_from_json, options_from_json, QuestionBankEntry, QuestionType, QuizDifficulty,
};
use crate::Error;
use serde_json::Value;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait QuestionBankRepo: Send + Sync {
    /// Draw up to `count` active entries, least-used first, bumping their
    /// usage counters.
    async fn draw(
        &self,
        tech_stack: &str,
        difficulty: QuizDifficulty,
        question_type: QuestionType,
        count: i64,
    ) -> Result<Vec<QuestionBankEntry>, Error>;
}

pub struct PostgresQuestionBankRepository {
    pool: Pool<Postgres>,
}

impl PostgresQuestionBankRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QuestionBankRepo for PostgresQuestionBankRepository {
    async fn draw(
        &self,
        tech_stack: &str,
        difficulty: QuizDifficulty,
        question_type: QuestionType,
        count: i64,
    ) -> Result<Vec<QuestionBankEntry>, Error> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            r#"
            SELECT entry_id, tech_stack, difficulty, question_type, question_text,
                   options, correct_answers, explanation, is_active, times_used, created_at
            FROM question_bank
            WHERE tech_stack ILIKE '%' || $1 || '%'
              AND difficulty = $2
              AND question_type = $3
              AND is_active
            ORDER BY times_used ASC, RANDOM()
            LIMIT $4
            "#,
        )
        .bind(tech_stack)
        .bind(difficulty)
        .bind(question_type)
        .bind(count)
        .fetch_all(&mut *tx)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for r in &rows {
            let options: Value = r.try_get("options")?;
            let correct: Value = r.try_get("correct_answers")?;
            entries.push(QuestionBankEntry {
                entry_id: r.try_get("entry_id")?,
                tech_stack: r.try_get("tech_stack")?,
                difficulty: r.try_get("difficulty")?,
                question_type: r.try_get("question_type")?,
                question_text: r.try_get("question_text")?,
                options: options_from_json(&options),
                correct_answers: answers_from_json(&correct),
                explanation: r.try_get("explanation")?,
                is_active: r.try_get("is_active")?,
                times_used: r.try_get("times_used")?,
                created_at: r.try_get("created_at")?,
            });
        }

        let ids: Vec<Uuid> = entries.iter().map(|e| e.entry_id).collect();
        if !ids.is_empty() {
            sqlx::query("UPDATE question_bank SET times_used = times_used + 1 WHERE entry_id = ANY($1)")
                .bind(&ids)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(entries)
    }
}

// src/repositories/postgres/points.rs

use naturequest_common::models::PointsTransaction;
use crate::Error;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PointsRepo: Send + Sync {
    async fn insert(&self, tx: &PointsTransaction) -> Result<(), Error>;
    /// Ledger page, newest first.
    async fn history(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PointsTransaction>, Error>;
}

pub struct PostgresPointsRepository {
    pool: Pool<Postgres>,
}

impl PostgresPointsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PointsRepo for PostgresPointsRepository {
    async fn insert(&self, tx: &PointsTransaction) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO points_transactions (
                transaction_id, user_id, transaction_type, points,
                description, challenge_id, quiz_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(tx.transaction_id)
        .bind(tx.user_id)
        .bind(tx.transaction_type)
        .bind(tx.points)
        .bind(&tx.description)
        .bind(tx.challenge_id)
        .bind(tx.quiz_id)
        .bind(tx.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn history(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PointsTransaction>, Error> {
        let rows = sqlx::query_as::<_, PointsTransaction>(
            r#"
            SELECT transaction_id, user_id, transaction_type, points,
                   description, challenge_id, quiz_id, created_at
            FROM points_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

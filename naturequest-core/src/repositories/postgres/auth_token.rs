// src/repositories/postgres/auth_token.rs

use naturequest_common::models::AuthToken;
use crate::Error;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AuthTokenRepo: Send + Sync {
    async fn insert(&self, token: &AuthToken) -> Result<(), Error>;
    async fn get(&self, token: &str) -> Result<Option<AuthToken>, Error>;
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, Error>;
}

pub struct PostgresAuthTokenRepository {
    pool: Pool<Postgres>,
}

impl PostgresAuthTokenRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AuthTokenRepo for PostgresAuthTokenRepository {
    async fn insert(&self, token: &AuthToken) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO auth_tokens (token, user_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&token.token)
        .bind(token.user_id)
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<AuthToken>, Error> {
        let row = sqlx::query_as::<_, AuthToken>(
            r#"
            SELECT token, user_id, created_at, expires_at
            FROM auth_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// src/repositories/postgres/level.rs

use naturequest_common::models::Level;
use crate::Error;
use sqlx::{Pool, Postgres};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LevelRepo: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Level>, Error>;
    /// Highest level whose threshold is at or below `points`.
    async fn highest_for_points(&self, points: i32) -> Result<Option<Level>, Error>;
    /// Next level after `level_number` (pass 0 for the first level).
    async fn next_above(&self, level_number: i32) -> Result<Option<Level>, Error>;
}

pub struct PostgresLevelRepository {
    pool: Pool<Postgres>,
}

impl PostgresLevelRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LevelRepo for PostgresLevelRepository {
    async fn list_all(&self) -> Result<Vec<Level>, Error> {
        let rows = sqlx::query_as::<_, Level>(
            r#"
            SELECT level_number, name, points_required, description
            FROM levels
            ORDER BY level_number ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn highest_for_points(&self, points: i32) -> Result<Option<Level>, Error> {
        let row = sqlx::query_as::<_, Level>(
            r#"
            SELECT level_number, name, points_required, description
            FROM levels
            WHERE points_required <= $1
            ORDER BY level_number DESC
            LIMIT 1
            "#,
        )
        .bind(points)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn next_above(&self, level_number: i32) -> Result<Option<Level>, Error> {
        let row = sqlx::query_as::<_, Level>(
            r#"
            SELECT level_number, name, points_required, description
            FROM levels
            WHERE level_number > $1
            ORDER BY level_number ASC
            LIMIT 1
            "#,
        )
        .bind(level_number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

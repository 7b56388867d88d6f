// src/repositories/postgres/challenge.rs

use naturequest_common::models::{
    options_from_json, Challenge, ChallengeDifficulty, LocationType,
};
use crate::Error;
use serde_json::Value;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChallengeRepo: Send + Sync {
    async fn list_active(
        &self,
        difficulty: Option<ChallengeDifficulty>,
        location_type: Option<LocationType>,
    ) -> Result<Vec<Challenge>, Error>;
    async fn get(&self, challenge_id: Uuid) -> Result<Option<Challenge>, Error>;
    async fn count_active(&self) -> Result<i64, Error>;
}

pub struct PostgresChallengeRepository {
    pool: Pool<Postgres>,
}

impl PostgresChallengeRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

pub(crate) fn challenge_from_row(r: &sqlx::postgres::PgRow) -> Result<Challenge, Error> {
    let required: Value = r.try_get("required_elements")?;
    Ok(Challenge {
        challenge_id: r.try_get("challenge_id")?,
        title: r.try_get("title")?,
        description: r.try_get("description")?,
        difficulty: r.try_get("difficulty")?,
        location_type: r.try_get("location_type")?,
        location_name: r.try_get("location_name")?,
        target_latitude: r.try_get("target_latitude")?,
        target_longitude: r.try_get("target_longitude")?,
        verification_radius_m: r.try_get("verification_radius_m")?,
        required_elements: options_from_json(&required),
        special_instructions: r.try_get("special_instructions")?,
        points_reward: r.try_get("points_reward")?,
        is_active: r.try_get("is_active")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

const CHALLENGE_COLUMNS: &str = r#"
    challenge_id, title, description, difficulty, location_type, location_name,
    target_latitude, target_longitude, verification_radius_m, required_elements,
    special_instructions, points_reward, is_active, created_at, updated_at
"#;

#[async_trait::async_trait]
impl ChallengeRepo for PostgresChallengeRepository {
    async fn list_active(
        &self,
        difficulty: Option<ChallengeDifficulty>,
        location_type: Option<LocationType>,
    ) -> Result<Vec<Challenge>, Error> {
        let sql = format!(
            r#"
            SELECT {CHALLENGE_COLUMNS}
            FROM challenges
            WHERE is_active
              AND ($1::TEXT IS NULL OR difficulty = $1)
              AND ($2::TEXT IS NULL OR location_type = $2)
            ORDER BY difficulty ASC, title ASC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(difficulty.map(|d| d.to_string()))
            .bind(location_type.map(|t| t.to_string()))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(challenge_from_row).collect()
    }

    async fn get(&self, challenge_id: Uuid) -> Result<Option<Challenge>, Error> {
        let sql = format!("SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE challenge_id = $1");
        let row = sqlx::query(&sql)
            .bind(challenge_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(challenge_from_row).transpose()
    }

    async fn count_active(&self) -> Result<i64, Error> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM challenges WHERE is_active")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("cnt")?)
    }
}

// src/repositories/postgres/profile.rs

use naturequest_common::models::{LeaderboardEntry, UserProfile};
use crate::Error;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProfileRepo: Send + Sync {
    /// Fetch the profile, creating an empty one on first touch.
    async fn get_or_create(&self, user_id: Uuid) -> Result<UserProfile, Error>;
    async fn update(&self, profile: &UserProfile) -> Result<(), Error>;
    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, Error>;
}

pub struct PostgresProfileRepository {
    pool: Pool<Postgres>,
}

impl PostgresProfileRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProfileRepo for PostgresProfileRepository {
    async fn get_or_create(&self, user_id: Uuid) -> Result<UserProfile, Error> {
        let existing = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT user_id, is_techie, tech_stacks, total_points, current_level,
                   challenges_completed, quizzes_completed, created_at, updated_at
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(profile) = existing {
            return Ok(profile);
        }

        let profile = UserProfile::new(user_id);
        sqlx::query(
            r#"
            INSERT INTO user_profiles (
                user_id, is_techie, tech_stacks, total_points, current_level,
                challenges_completed, quizzes_completed, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(profile.user_id)
        .bind(profile.is_techie)
        .bind(&profile.tech_stacks)
        .bind(profile.total_points)
        .bind(profile.current_level)
        .bind(profile.challenges_completed)
        .bind(profile.quizzes_completed)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn update(&self, profile: &UserProfile) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE user_profiles
            SET is_techie = $1,
                tech_stacks = $2,
                total_points = $3,
                current_level = $4,
                challenges_completed = $5,
                quizzes_completed = $6,
                updated_at = $7
            WHERE user_id = $8
            "#,
        )
        .bind(profile.is_techie)
        .bind(&profile.tech_stacks)
        .bind(profile.total_points)
        .bind(profile.current_level)
        .bind(profile.challenges_completed)
        .bind(profile.quizzes_completed)
        .bind(Utc::now())
        .bind(profile.user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, Error> {
        let rows = sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT u.username,
                   p.total_points,
                   l.name AS level_name,
                   p.challenges_completed,
                   p.quizzes_completed
            FROM user_profiles p
            JOIN users u ON u.user_id = p.user_id
            LEFT JOIN levels l ON l.level_number = p.current_level
            ORDER BY p.total_points DESC, u.username ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// src/repositories/postgres/challenge_attempt.rs

use naturequest_common::models::ChallengeAttempt;
use crate::Error;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChallengeAttemptRepo: Send + Sync {
    async fn insert(&self, attempt: &ChallengeAttempt) -> Result<(), Error>;
    async fn get(&self, attempt_id: Uuid) -> Result<Option<ChallengeAttempt>, Error>;
    async fn find_for_user_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Option<ChallengeAttempt>, Error>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ChallengeAttempt>, Error>;
    /// Submissions by the user at or after `since`.
    async fn count_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64, Error>;
    /// Prior attempts from exactly the same coordinates.
    async fn count_same_location(
        &self,
        user_id: Uuid,
        latitude: f64,
        longitude: f64,
        exclude_attempt: Uuid,
    ) -> Result<i64, Error>;
    /// Most recent attempt strictly before `before`.
    async fn previous_before(
        &self,
        user_id: Uuid,
        before: DateTime<Utc>,
    ) -> Result<Option<ChallengeAttempt>, Error>;
    /// Whether the photo digest was already submitted by anyone else.
    async fn digest_seen(&self, digest: &str, exclude_attempt: Uuid) -> Result<bool, Error>;
    /// Write back verification outcome fields.
    async fn finalize(&self, attempt: &ChallengeAttempt) -> Result<(), Error>;
}

pub struct PostgresChallengeAttemptRepository {
    pool: Pool<Postgres>,
}

impl PostgresChallengeAttemptRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn attempt_from_row(r: &sqlx::postgres::PgRow) -> Result<ChallengeAttempt, Error> {
    let details: Value = r.try_get("verification_details")?;
    Ok(ChallengeAttempt {
        attempt_id: r.try_get("attempt_id")?,
        user_id: r.try_get("user_id")?,
        challenge_id: r.try_get("challenge_id")?,
        status: r.try_get("status")?,
        photo_url: r.try_get("photo_url")?,
        photo_digest: r.try_get("photo_digest")?,
        submitted_latitude: r.try_get("submitted_latitude")?,
        submitted_longitude: r.try_get("submitted_longitude")?,
        submission_notes: r.try_get("submission_notes")?,
        location_verified: r.try_get("location_verified")?,
        verification_details: details,
        points_earned: r.try_get("points_earned")?,
        bonus_points: r.try_get("bonus_points")?,
        created_at: r.try_get("created_at")?,
        verified_at: r.try_get("verified_at")?,
    })
}

const ATTEMPT_COLUMNS: &str = r#"
    attempt_id, user_id, challenge_id, status, photo_url, photo_digest,
    submitted_latitude, submitted_longitude, submission_notes, location_verified,
    verification_details, points_earned, bonus_points, created_at, verified_at
"#;

#[async_trait::async_trait]
impl ChallengeAttemptRepo for PostgresChallengeAttemptRepository {
    async fn insert(&self, attempt: &ChallengeAttempt) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO challenge_attempts (
                attempt_id, user_id, challenge_id, status, photo_url, photo_digest,
                submitted_latitude, submitted_longitude, submission_notes,
                location_verified, verification_details, points_earned, bonus_points,
                created_at, verified_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(attempt.attempt_id)
        .bind(attempt.user_id)
        .bind(attempt.challenge_id)
        .bind(attempt.status)
        .bind(&attempt.photo_url)
        .bind(&attempt.photo_digest)
        .bind(attempt.submitted_latitude)
        .bind(attempt.submitted_longitude)
        .bind(&attempt.submission_notes)
        .bind(attempt.location_verified)
        .bind(&attempt.verification_details)
        .bind(attempt.points_earned)
        .bind(attempt.bonus_points)
        .bind(attempt.created_at)
        .bind(attempt.verified_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, attempt_id: Uuid) -> Result<Option<ChallengeAttempt>, Error> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM challenge_attempts WHERE attempt_id = $1");
        let row = sqlx::query(&sql)
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(attempt_from_row).transpose()
    }

    async fn find_for_user_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Option<ChallengeAttempt>, Error> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM challenge_attempts WHERE user_id = $1 AND challenge_id = $2"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(challenge_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(attempt_from_row).transpose()
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ChallengeAttempt>, Error> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM challenge_attempts WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(attempt_from_row).collect()
    }

    async fn count_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64, Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS cnt
            FROM challenge_attempts
            WHERE user_id = $1 AND created_at >= $2
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("cnt")?)
    }

    async fn count_same_location(
        &self,
        user_id: Uuid,
        latitude: f64,
        longitude: f64,
        exclude_attempt: Uuid,
    ) -> Result<i64, Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS cnt
            FROM challenge_attempts
            WHERE user_id = $1
              AND submitted_latitude = $2
              AND submitted_longitude = $3
              AND attempt_id <> $4
            "#,
        )
        .bind(user_id)
        .bind(latitude)
        .bind(longitude)
        .bind(exclude_attempt)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("cnt")?)
    }

    async fn previous_before(
        &self,
        user_id: Uuid,
        before: DateTime<Utc>,
    ) -> Result<Option<ChallengeAttempt>, Error> {
        let sql = format!(
            r#"
            SELECT {ATTEMPT_COLUMNS}
            FROM challenge_attempts
            WHERE user_id = $1 AND created_at < $2
            ORDER BY created_at DESC
            LIMIT 1
            "#
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(before)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(attempt_from_row).transpose()
    }

    async fn digest_seen(&self, digest: &str, exclude_attempt: Uuid) -> Result<bool, Error> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM challenge_attempts
                WHERE photo_digest = $1 AND attempt_id <> $2
            ) AS seen
            "#,
        )
        .bind(digest)
        .bind(exclude_attempt)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("seen")?)
    }

    async fn finalize(&self, attempt: &ChallengeAttempt) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE challenge_attempts
            SET status = $1,
                location_verified = $2,
                verification_details = $3,
                points_earned = $4,
                bonus_points = $5,
                verified_at = $6
            WHERE attempt_id = $7
            "#,
        )
        .bind(attempt.status)
        .bind(attempt.location_verified)
        .bind(&attempt.verification_details)
        .bind(attempt.points_earned)
        .bind(attempt.bonus_points)
        .bind(attempt.verified_at)
        .bind(attempt.attempt_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
